//! Relay server for browser clients of the Quai explorer and node.
//!
//! Accepts `POST /` with `{"type": "rest" | "rpc", ...}` bodies and
//! forwards them to the configured upstreams.

mod config;
mod error;

use std::{process::exit, sync::Arc};

use clap::Parser;
use quai_portfolio::{
    explorer::ExplorerClient,
    relay::{self, Relay},
    rpc::ChainRpc,
};
use tokio::net::TcpListener;
use tracing::{error, info};

use config::{CliConfig, EnvConfig, RelayConfig};
use error::Result;

#[tokio::main]
async fn main() {
    // Load .env file
    if let Err(e) = dotenvy::dotenv() {
        eprintln!("Warning: Failed to load .env file: {}", e);
    }

    let env_config = match EnvConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to parse environment configuration: {}", e);
            exit(1);
        }
    };

    let cli_config = CliConfig::parse();

    let config = match RelayConfig::new(&env_config, &cli_config) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Invalid configuration: {}", e);
            exit(1);
        }
    };

    // Set up logging
    if std::env::var("RUST_LOG").is_err() {
        unsafe {
            std::env::set_var("RUST_LOG", "info");
        }
    }

    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    if let Err(e) = run(config).await {
        error!(%e, "Relay encountered an error, shutting down");
        exit(1);
    }
}

async fn run(config: RelayConfig) -> Result<()> {
    info!(
        explorer_url = %config.explorer_url,
        rpc_url = %config.rpc_url,
        timeout = ?config.timeout,
        "Starting relay"
    );

    let explorer = ExplorerClient::new(config.explorer_url, config.timeout)?;
    let rpc = ChainRpc::with_timeout(config.rpc_url, "quai", config.timeout)?;
    let relay = Arc::new(Relay::new(explorer, rpc));

    let listener = TcpListener::bind(config.listen).await?;
    relay::serve(listener, relay).await?;
    Ok(())
}
