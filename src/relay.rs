//! Server-side relay to the explorer and the node.
//!
//! Browsers cannot call the upstreams directly. They `POST /` one of
//!
//! ```json
//! {"type": "rest", "endpoint": "/v2/stats"}
//! {"type": "rpc", "rpcMethod": "quai_blockNumber", "rpcParams": []}
//! ```
//!
//! and receive the upstream JSON (`rest`) or `{"result": ...}` (`rpc`).
//! Upstream failures keep their HTTP status.

use std::sync::Arc;

use axum::{
    Json, Router,
    body::Bytes,
    extract::State,
    http::{HeaderName, Method, StatusCode, header},
    response::{IntoResponse, Response},
    routing::post,
};
use serde::Deserialize;
use serde_json::{Value, json};
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tracing::{info, warn};

use crate::{error::ClientError, explorer::ExplorerClient, rpc::ChainRpc};

const METHOD_NOT_FOUND: i64 = -32601;

#[derive(Debug, Deserialize)]
struct RelayBody {
    #[serde(rename = "type")]
    kind: Option<String>,
    endpoint: Option<String>,
    #[serde(rename = "rpcMethod")]
    rpc_method: Option<String>,
    #[serde(rename = "rpcParams")]
    rpc_params: Option<Vec<Value>>,
}

/// Validated relay request.
#[derive(Clone, Debug, PartialEq)]
pub enum RelayRequest {
    Rest { endpoint: String },
    Rpc { method: String, params: Vec<Value> },
}

impl RelayRequest {
    pub fn parse(body: &[u8]) -> Result<Self, RelayError> {
        let body: RelayBody =
            serde_json::from_slice(body).map_err(|e| RelayError::MalformedBody(e.to_string()))?;
        match body.kind.as_deref() {
            Some("rest") => {
                let endpoint = body.endpoint.ok_or(RelayError::MissingField("endpoint"))?;
                if !endpoint.starts_with('/') && !endpoint.starts_with('?') {
                    return Err(RelayError::InvalidEndpoint(endpoint));
                }
                Ok(Self::Rest { endpoint })
            }
            Some("rpc") => Ok(Self::Rpc {
                method: body.rpc_method.ok_or(RelayError::MissingField("rpcMethod"))?,
                params: body.rpc_params.unwrap_or_default(),
            }),
            _ => Err(RelayError::InvalidType),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    #[error("Invalid request type. Use 'rest' or 'rpc'")]
    InvalidType,

    #[error("Missing field: {0}")]
    MissingField(&'static str),

    #[error("Endpoint must start with '/' or '?': {0}")]
    InvalidEndpoint(String),

    #[error("Malformed request body: {0}")]
    MalformedBody(String),

    #[error("{error}")]
    Upstream {
        status: u16,
        error: String,
        details: String,
    },

    #[error("{message}")]
    Rpc { code: i64, message: String },

    #[error("Upstream unavailable: {0}")]
    Unavailable(String),
}

impl RelayError {
    fn from_rest(err: ClientError) -> Self {
        match err {
            ClientError::Http { status, message } => Self::Upstream {
                status,
                error: format!("API error: {status}"),
                details: message,
            },
            other => Self::Unavailable(other.to_string()),
        }
    }

    fn from_rpc(err: ClientError) -> Self {
        match err {
            ClientError::Http { status, message } => Self::Upstream {
                status,
                error: format!("RPC error: {status}"),
                details: message,
            },
            ClientError::Rpc { code, message } => Self::Rpc { code, message },
            ClientError::MethodNotSupported(message) => Self::Rpc {
                code: METHOD_NOT_FOUND,
                message,
            },
            other => Self::Unavailable(other.to_string()),
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::InvalidType
            | Self::MissingField(_)
            | Self::InvalidEndpoint(_)
            | Self::MalformedBody(_)
            | Self::Rpc { .. } => StatusCode::BAD_REQUEST,
            Self::Upstream { status, .. } => {
                StatusCode::from_u16(*status).unwrap_or(StatusCode::BAD_GATEWAY)
            }
            Self::Unavailable(_) => StatusCode::BAD_GATEWAY,
        }
    }
}

impl IntoResponse for RelayError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = match &self {
            Self::Upstream { error, details, .. } => json!({ "error": error, "details": details }),
            Self::Rpc { code, message } => json!({ "error": message, "code": code }),
            other => json!({ "error": other.to_string() }),
        };
        (status, Json(body)).into_response()
    }
}

/// Upstream clients the relay forwards to.
#[derive(Clone, Debug)]
pub struct Relay {
    explorer: ExplorerClient,
    rpc: ChainRpc,
}

impl Relay {
    pub fn new(explorer: ExplorerClient, rpc: ChainRpc) -> Self {
        Self { explorer, rpc }
    }

    pub async fn forward(&self, request: RelayRequest) -> Result<Value, RelayError> {
        match request {
            RelayRequest::Rest { endpoint } => {
                info!(%endpoint, "relaying rest request");
                self.explorer
                    .get_raw(&endpoint)
                    .await
                    .map_err(RelayError::from_rest)
            }
            RelayRequest::Rpc { method, params } => {
                info!(%method, "relaying rpc request");
                let result: Value = self
                    .rpc
                    .invoke(&method, params)
                    .await
                    .map_err(RelayError::from_rpc)?;
                Ok(json!({ "result": result }))
            }
        }
    }
}

pub fn router(relay: Arc<Relay>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::POST, Method::OPTIONS])
        .allow_headers([
            header::AUTHORIZATION,
            HeaderName::from_static("x-client-info"),
            HeaderName::from_static("apikey"),
            header::CONTENT_TYPE,
        ]);

    Router::new()
        .route("/", post(handle))
        .layer(cors)
        .with_state(relay)
}

pub async fn serve(listener: TcpListener, relay: Arc<Relay>) -> std::io::Result<()> {
    if let Ok(addr) = listener.local_addr() {
        info!(%addr, "relay listening");
    }
    axum::serve(listener, router(relay)).await
}

async fn handle(State(relay): State<Arc<Relay>>, body: Bytes) -> Result<Json<Value>, RelayError> {
    let request = RelayRequest::parse(&body).inspect_err(|err| warn!(%err, "rejected relay request"))?;
    let response = relay
        .forward(request)
        .await
        .inspect_err(|err| warn!(%err, status = err.status().as_u16(), "relay request failed"))?;
    Ok(Json(response))
}
