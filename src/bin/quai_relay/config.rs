//! Configuration for the relay.
//!
//! Configuration comes from two sources:
//! - Environment variables (via .env file or shell): upstream URLs, timeouts
//! - CLI arguments: listen address override

use std::{net::SocketAddr, time::Duration};

use clap::Parser;
use quai_portfolio::Network;
use url::Url;

const DEFAULT_LISTEN_ADDR: &str = "0.0.0.0:8787";
const DEFAULT_TIMEOUT_SECONDS: u64 = 10;

/// Environment configuration.
#[derive(Debug, Default, serde::Deserialize)]
pub struct EnvConfig {
    /// Explorer API base URL (default: Quaiscan)
    pub explorer_url: Option<String>,

    /// Node JSON-RPC URL (default: Cyprus-1 public node)
    pub rpc_url: Option<String>,

    /// Address to listen on (default: 0.0.0.0:8787)
    pub relay_listen_addr: Option<String>,

    /// Upstream request timeout (default: 10s)
    pub request_timeout_seconds: Option<u64>,
}

impl EnvConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, envy::Error> {
        envy::from_env()
    }
}

#[derive(Debug, Default, Parser)]
#[command(name = "quai_relay")]
#[command(about = "Relay explorer and node requests for browser clients")]
pub struct CliConfig {
    /// Address to listen on, overrides RELAY_LISTEN_ADDR
    #[arg(short, long)]
    pub listen: Option<String>,
}

/// Validated relay configuration.
#[derive(Debug)]
pub struct RelayConfig {
    pub listen: SocketAddr,
    pub explorer_url: Url,
    pub rpc_url: Url,
    pub timeout: Duration,
}

impl RelayConfig {
    pub fn new(env: &EnvConfig, cli: &CliConfig) -> Result<Self, ConfigError> {
        let preset = Network::cyprus1();

        let listen = cli
            .listen
            .as_deref()
            .or(env.relay_listen_addr.as_deref())
            .unwrap_or(DEFAULT_LISTEN_ADDR);
        let listen = listen
            .parse()
            .map_err(|_| ConfigError::InvalidListenAddr(listen.to_string()))?;

        let explorer_url = match &env.explorer_url {
            Some(url) => parse_url("EXPLORER_URL", url)?,
            None => preset.explorer_url().clone(),
        };
        let rpc_url = match &env.rpc_url {
            Some(url) => parse_url("RPC_URL", url)?,
            None => preset.rpc_url().clone(),
        };

        let timeout_seconds = env.request_timeout_seconds.unwrap_or(DEFAULT_TIMEOUT_SECONDS);
        if timeout_seconds == 0 {
            return Err(ConfigError::ZeroTimeout);
        }

        Ok(Self {
            listen,
            explorer_url,
            rpc_url,
            timeout: Duration::from_secs(timeout_seconds),
        })
    }
}

fn parse_url(name: &'static str, raw: &str) -> Result<Url, ConfigError> {
    let url = Url::parse(raw).map_err(|e| ConfigError::InvalidUrl(name, e))?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        scheme => Err(ConfigError::UnsupportedScheme(name, scheme.to_string())),
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid listen address: {0}")]
    InvalidListenAddr(String),

    #[error("Invalid {0}: {1}")]
    InvalidUrl(&'static str, url::ParseError),

    #[error("{0} must use http or https, got {1}")]
    UnsupportedScheme(&'static str, String),

    #[error("REQUEST_TIMEOUT_SECONDS cannot be zero")]
    ZeroTimeout,
}
