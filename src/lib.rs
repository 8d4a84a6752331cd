//! Quai Network portfolio SDK.
//!
//! # Overview
//!
//! Read-side plumbing of a Quai dashboard: explorer and node clients,
//! a TTL query cache, wallet session state and the portfolio aggregator.
//!
//! Use [`gateway::Gateway`] to get cached access to both the explorer
//! ([`explorer::ExplorerClient`]) and the node ([`rpc::ChainRpc`]), then
//! [`portfolio::PortfolioTracker`] to load and aggregate the holdings of the
//! address held by a [`session::WalletSession`]. [`analytics`] derives
//! volume and block activity from the same explorer pages.
//!
//! [`relay::router`] exposes the same upstreams to browsers through a single
//! CORS-enabled endpoint.
//!
//! See `./tests` for examples.
//!
//! # Limitations/follow-ups
//!
//! * Only the first page of list endpoints is aggregated, follow-up pages
//!   are available through [`types::Page::next_query`].
//!
//! * Fiat values of tokens are taken as reported by the explorer.
//!
//! # Testing
//!
//! [`testing`] module provides an in-process mock of the explorer and RPC
//! node with configurable fixtures.

pub mod analytics;
pub mod cache;
pub mod error;
pub mod explorer;
pub mod gateway;
pub mod market;
pub mod num;
pub mod portfolio;
pub mod relay;
pub mod risk;
pub mod rpc;
pub mod session;
pub mod testing;
pub mod types;

use url::Url;

const CYPRUS1_EXPLORER_URL: &str = "https://quaiscan.io/api";
const CYPRUS1_RPC_URL: &str = "https://rpc.quai.network/cyprus1/api/eth-rpc";

/// Network the dashboard is reading from.
#[derive(Clone, Debug)]
pub struct Network {
    name: String,
    explorer_url: Url,
    rpc_url: Url,
    rpc_namespace: String,
    native_symbol: String,
    native_decimals: u8,
}

impl Network {
    /// Cyprus-1 zone of Quai mainnet.
    pub fn cyprus1() -> Self {
        Self {
            name: "cyprus1".to_string(),
            explorer_url: Url::parse(CYPRUS1_EXPLORER_URL).expect("static explorer URL"),
            rpc_url: Url::parse(CYPRUS1_RPC_URL).expect("static RPC URL"),
            rpc_namespace: "quai".to_string(),
            native_symbol: "QUAI".to_string(),
            native_decimals: num::NATIVE_DECIMALS,
        }
    }

    pub fn custom(name: impl Into<String>, explorer_url: Url, rpc_url: Url) -> Self {
        Self {
            name: name.into(),
            explorer_url,
            rpc_url,
            ..Self::cyprus1()
        }
    }

    pub fn with_rpc_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.rpc_namespace = namespace.into();
        self
    }

    pub fn with_native(mut self, symbol: impl Into<String>, decimals: u8) -> Self {
        self.native_symbol = symbol.into();
        self.native_decimals = decimals;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn explorer_url(&self) -> &Url {
        &self.explorer_url
    }

    pub fn rpc_url(&self) -> &Url {
        &self.rpc_url
    }

    /// Prefix of node methods, `quai` for `quai_getBalance`.
    pub fn rpc_namespace(&self) -> &str {
        &self.rpc_namespace
    }

    pub fn native_symbol(&self) -> &str {
        &self.native_symbol
    }

    pub fn native_decimals(&self) -> u8 {
        self.native_decimals
    }
}
