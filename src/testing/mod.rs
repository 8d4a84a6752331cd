//! In-process mock of the block explorer and the chain node.
//!
//! [`MockUpstream`] binds an axum server on a random local port. Explorer
//! requests are served under `/api` from fixtures registered by path and
//! query, unknown paths answer 404 like the explorer does for unknown
//! addresses. JSON-RPC requests are served under `/rpc` from fixtures
//! registered by method name, unknown methods answer `-32601`.
//!
//! Every request is counted, so tests can assert which upstream calls were
//! made.

use std::{net::SocketAddr, sync::Arc, time::Duration};

use axum::{
    Json, Router,
    extract::State,
    http::{StatusCode, Uri},
    response::{IntoResponse, Response},
    routing::post,
};
use dashmap::DashMap;
use serde_json::{Value, json};
use tokio::{net::TcpListener, task::JoinHandle};
use url::Url;

use crate::{Network, error::ClientError, explorer::ExplorerClient, gateway::Gateway, rpc::ChainRpc};

const EXPLORER_PREFIX: &str = "/api";
const RPC_PATH: &str = "/rpc";

/// Canned answer of the node to one method.
#[derive(Clone, Debug)]
pub enum RpcReply {
    Result(Value),
    Error { code: i64, message: String },
    /// Fails the HTTP request itself with the given status.
    Status(u16),
}

#[derive(Debug, Default)]
struct MockState {
    rest: DashMap<String, (u16, Value)>,
    rpc: DashMap<String, RpcReply>,
    delays: DashMap<String, Duration>,
    hits: DashMap<String, usize>,
}

impl MockState {
    fn hit(&self, key: &str) {
        *self.hits.entry(key.to_string()).or_default() += 1;
    }

    async fn delay(&self, key: &str) {
        let delay = self.delays.get(key).map(|d| *d);
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
    }
}

#[derive(Debug)]
pub struct MockUpstream {
    addr: SocketAddr,
    state: Arc<MockState>,
    server: JoinHandle<()>,
}

impl MockUpstream {
    pub async fn start() -> Result<Self, std::io::Error> {
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        let state = Arc::new(MockState::default());

        let app = Router::new()
            .route(RPC_PATH, post(rpc_handler))
            .fallback(rest_handler)
            .with_state(state.clone());
        let server = tokio::spawn(async move {
            if let Err(err) = axum::serve(listener, app).await {
                tracing::error!(%err, "mock upstream stopped");
            }
        });

        Ok(Self { addr, state, server })
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    pub fn explorer_url(&self) -> Url {
        self.url(EXPLORER_PREFIX)
    }

    pub fn rpc_url(&self) -> Url {
        self.url(RPC_PATH)
    }

    pub fn network(&self) -> Network {
        Network::custom("mock", self.explorer_url(), self.rpc_url())
    }

    pub fn explorer(&self) -> Result<ExplorerClient, ClientError> {
        ExplorerClient::for_network(&self.network())
    }

    pub fn rpc(&self) -> ChainRpc {
        ChainRpc::for_network(&self.network())
    }

    pub fn gateway(&self) -> Result<Gateway, ClientError> {
        Gateway::for_network(self.network())
    }

    /// Serves `body` for `GET /api{path_and_query}`.
    pub fn rest(&self, path_and_query: &str, body: Value) {
        self.rest_status(path_and_query, 200, body);
    }

    pub fn rest_status(&self, path_and_query: &str, status: u16, body: Value) {
        self.state.rest.insert(path_and_query.to_string(), (status, body));
    }

    pub fn rpc_result(&self, method: &str, result: Value) {
        self.state.rpc.insert(method.to_string(), RpcReply::Result(result));
    }

    pub fn rpc_error(&self, method: &str, code: i64, message: &str) {
        self.state.rpc.insert(
            method.to_string(),
            RpcReply::Error {
                code,
                message: message.to_string(),
            },
        );
    }

    pub fn rpc_status(&self, method: &str, status: u16) {
        self.state.rpc.insert(method.to_string(), RpcReply::Status(status));
    }

    /// Delays answers to `key`, a REST path and query or an RPC method.
    pub fn delay(&self, key: &str, delay: Duration) {
        self.state.delays.insert(key.to_string(), delay);
    }

    /// Requests received for `key`, a REST path and query or an RPC method.
    pub fn hits(&self, key: &str) -> usize {
        self.state.hits.get(key).map(|h| *h).unwrap_or_default()
    }

    pub fn total_hits(&self) -> usize {
        self.state.hits.iter().map(|h| *h.value()).sum()
    }

    fn url(&self, path: &str) -> Url {
        Url::parse(&format!("http://{}{path}", self.addr)).expect("socket address forms a valid URL")
    }
}

impl Drop for MockUpstream {
    fn drop(&mut self) {
        self.server.abort();
    }
}

async fn rest_handler(State(state): State<Arc<MockState>>, uri: Uri) -> Response {
    let path = uri.path().strip_prefix(EXPLORER_PREFIX).unwrap_or(uri.path());
    let key = match uri.query() {
        Some(query) => format!("{path}?{query}"),
        None => path.to_string(),
    };
    state.hit(&key);
    state.delay(&key).await;

    let fixture = state.rest.get(&key).map(|entry| entry.value().clone());
    match fixture {
        Some((status, body)) => {
            let status = StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
            (status, Json(body)).into_response()
        }
        None => (StatusCode::NOT_FOUND, Json(json!({"message": "Not found"}))).into_response(),
    }
}

async fn rpc_handler(State(state): State<Arc<MockState>>, Json(request): Json<Value>) -> Response {
    let id = request.get("id").cloned().unwrap_or(Value::Null);
    let method = request
        .get("method")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();
    state.hit(&method);
    state.delay(&method).await;

    let reply = state.rpc.get(&method).map(|entry| entry.value().clone());
    match reply {
        Some(RpcReply::Result(result)) => {
            Json(json!({"jsonrpc": "2.0", "id": id, "result": result})).into_response()
        }
        Some(RpcReply::Error { code, message }) => Json(json!({
            "jsonrpc": "2.0",
            "id": id,
            "error": {"code": code, "message": message}
        }))
        .into_response(),
        Some(RpcReply::Status(status)) => {
            let status = StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
            (status, "upstream failure").into_response()
        }
        None => Json(json!({
            "jsonrpc": "2.0",
            "id": id,
            "error": {"code": -32601, "message": format!("the method {method} does not exist/is not available")}
        }))
        .into_response(),
    }
}
