//! Portfolio viewer binary - prints the portfolio of an address and the
//! market overview of the network.

use std::process::exit;

use alloy::{primitives::Address, rpc::client::RpcClient, transports::layers::RetryBackoffLayer};
use clap::{Parser, ValueEnum};
use quai_portfolio::{
    Network, analytics,
    explorer::{self, ExplorerClient},
    gateway::{Gateway, GatewayConfig},
    market::{self, MarketOverview},
    portfolio::{PortfolioTracker, PortfolioView},
    risk,
    rpc::ChainRpc,
};
use url::Url;

#[derive(Debug, Clone, Copy, ValueEnum, Default)]
enum NetworkPreset {
    /// Cyprus-1 zone of Quai mainnet
    #[default]
    Cyprus1,
    /// Explorer and RPC URLs given on the command line
    Custom,
}

#[derive(Parser, Debug)]
#[command(name = "portfolio_viewer")]
#[command(about = "Print the portfolio of a Quai address")]
struct Args {
    /// Address to inspect
    #[arg(short, long)]
    address: Address,

    /// Network preset
    #[arg(short, long, value_enum, default_value = "cyprus1")]
    network: NetworkPreset,

    /// Explorer API base URL, required for the custom network
    #[arg(long)]
    explorer_url: Option<Url>,

    /// Node JSON-RPC URL, required for the custom network
    #[arg(long)]
    rpc_url: Option<Url>,

    /// Print individual token holdings
    #[arg(short, long)]
    tokens: bool,
}

impl Args {
    fn network(&self) -> Result<Network, String> {
        let preset = Network::cyprus1();
        match self.network {
            NetworkPreset::Cyprus1 => Ok(Network::custom(
                preset.name(),
                self.explorer_url.clone().unwrap_or_else(|| preset.explorer_url().clone()),
                self.rpc_url.clone().unwrap_or_else(|| preset.rpc_url().clone()),
            )),
            NetworkPreset::Custom => match (&self.explorer_url, &self.rpc_url) {
                (Some(explorer_url), Some(rpc_url)) => Ok(Network::custom(
                    "custom",
                    explorer_url.clone(),
                    rpc_url.clone(),
                )),
                _ => Err("custom network requires --explorer-url and --rpc-url".to_string()),
            },
        }
    }
}

/// Transactions listed individually.
const RECENT_TRANSACTIONS: usize = 10;
/// Blocks listed in the activity table.
const RECENT_BLOCKS: usize = 20;

fn print_portfolio(view: &PortfolioView, show_tokens: bool) {
    let snapshot = view.snapshot();
    let symbol = &view.native().symbol;

    println!("\n{:=^60}", " Portfolio ");
    println!(
        "{:<24}{:>20.6} {symbol}",
        "Native balance:", snapshot.native_balance
    );
    println!("{:<24}{:>20.4} USD", "Native price:", snapshot.native_price_usd);
    println!("{:<24}{:>20.2} USD", "Native value:", snapshot.native_value_usd);
    println!("{:<24}{:>20.2} USD", "Token value:", snapshot.token_values_usd);
    println!("{:<24}{:>20.2} USD", "Total value:", snapshot.total_value_usd);
    println!("{:<24}{:>20}", "Assets:", snapshot.asset_count);

    if !snapshot.allocations.is_empty() {
        println!("\n{:-^60}", " Allocation ");
        for allocation in &snapshot.allocations {
            println!(
                "{:<24}{:>16.2} USD {:>8.2}%",
                allocation.symbol, allocation.value_usd, allocation.share_pct
            );
        }
        let risk = risk::concentration(&snapshot);
        println!(
            "Concentration: {:?} ({:.1}% in {})",
            risk.level,
            risk.largest_share_pct,
            risk.symbol.as_deref().unwrap_or("-")
        );
    }

    if show_tokens {
        println!("\n{:-^60}", " Tokens ");
        let holdings = view.holdings();
        if holdings.is_empty() {
            println!("(none)");
        }
        for holding in holdings {
            println!(
                "{:<24}{:>20.6} {:>12.2} USD",
                holding.token.label(),
                holding.display_amount(),
                holding.value_usd()
            );
        }
    }

    if let (Some(txs), Some(address)) = (view.transactions.ready(), view.address()) {
        let address = address.to_string();
        let summary = analytics::transaction_summary(&txs.items, view.price_usd(), &address);
        println!("\n{:-^60}", " Transactions ");
        println!("{:<24}{:>20}", "Count:", summary.count);
        println!("{:<24}{:>20} / {}", "Sent / received:", summary.sent, summary.received);
        println!("{:<24}{:>20.6} {symbol}", "Volume:", summary.volume_native);
        println!("{:<24}{:>20.2} USD", "Volume:", summary.volume_usd);
        println!("{:<24}{:>20.2} USD", "Average value:", summary.average_value_usd);
        for flow in analytics::transaction_flows(&txs.items, view.price_usd(), &address)
            .iter()
            .take(RECENT_TRANSACTIONS)
        {
            println!(
                "{:<10}{:<34}{:>12.2} USD",
                format!("{:?}", flow.direction),
                flow.hash,
                flow.value_usd
            );
        }
    }

    for err in view.errors() {
        println!("! {err}");
    }
}

fn print_market(overview: &MarketOverview) {
    println!("\n{:=^60}", " Market ");
    if let Some(price) = overview.price_usd() {
        println!("{:<24}{:>20.4} USD", "Price:", price);
    }
    if let Some(price) = overview.price_btc() {
        println!("{:<24}{:>20.10} BTC", "Price:", price);
    }
    if let Some(cap) = overview.market_cap_usd() {
        println!("{:<24}{:>20.0} USD", "Market cap:", cap);
    }
    if let Some(status) = overview.network_status.ready() {
        println!("{:<24}{:>20}", "Block:", status.block_number);
        println!("{:<24}{:>20.3} gwei", "Gas price:", status.gas_price_gwei());
        if status.priority_fee.is_reported() {
            println!("{:<24}{:>20.3} gwei", "Priority fee:", status.priority_fee_gwei());
        } else {
            println!("{:<24}{:>20}", "Priority fee:", "not reported");
        }
    }
    if let Some(utilization) = overview.average_utilization_pct() {
        println!("{:<24}{:>19.1}%", "Block utilization:", utilization);
    }
    if let Some(blocks) = overview.blocks.ready() {
        for block in analytics::block_activity(&blocks.items, RECENT_BLOCKS) {
            println!(
                "#{:<23}{:>8} txs {:>12.3} Ggas",
                block.number, block.tx_count, block.gas_used_giga
            );
        }
    }
    if overview.is_error() {
        println!("! market data partially unavailable");
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    if std::env::var("RUST_LOG").is_err() {
        unsafe {
            std::env::set_var("RUST_LOG", "warn");
        }
    }

    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let network = match args.network() {
        Ok(network) => network,
        Err(e) => {
            eprintln!("{e}");
            exit(1);
        }
    };

    println!("Connecting to {} ...", network.rpc_url());

    let client = RpcClient::builder()
        .layer(RetryBackoffLayer::new(10, 100, 200))
        .http(network.rpc_url().clone());
    let rpc = ChainRpc::new(client, network.rpc_namespace());
    let explorer = ExplorerClient::new(network.explorer_url().clone(), explorer::DEFAULT_TIMEOUT)?;

    let gateway = Gateway::new(network.clone(), explorer, rpc, GatewayConfig::default());
    let tracker = PortfolioTracker::new(gateway, &network);

    let (view, overview) = tokio::join!(
        tracker.load(Some(args.address)),
        market::load_market(tracker.source())
    );

    println!("Address: {}", args.address);
    print_portfolio(&view, args.tokens);
    print_market(&overview);

    if view.is_error() {
        exit(2);
    }
    Ok(())
}
