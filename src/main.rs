use alloy::primitives::Address;
use auction_dapp::{
    binding::{
        DEFAULT_CONTRACT_ADDRESS,
        SchemaSource,
    },
    config::{
        AppConfig,
        DEFAULT_BIDDER,
        DEFAULT_LOG_DIR,
        DEFAULT_REFRESH_INTERVAL,
        DEFAULT_RPC_URL,
        DEFAULT_SCHEMA,
    },
    session::DEFAULT_GAS_BUDGET,
};
use clap::Parser;
use color_eyre::eyre::Result;
use std::{
    path::PathBuf,
    time::Duration,
};
use url::Url;

mod client;
mod ui;

/// Terminal client for bidding on an on-chain car auction.
#[derive(Parser, Debug)]
#[command(version)]
struct Args {
    /// Websocket endpoint of the node
    #[arg(long, default_value = DEFAULT_RPC_URL)]
    rpc_url: String,

    /// Account every transaction is sent from; must be unlocked on the node
    #[arg(long, default_value_t = DEFAULT_BIDDER)]
    bidder: Address,

    /// Contract ABI, as a path or an http(s)/file URL
    #[arg(long, default_value = DEFAULT_SCHEMA)]
    abi: String,

    /// Location URL; its `contractId` query parameter selects the auction
    #[arg(long)]
    location: Option<Url>,

    /// Auction used when the location names none
    #[arg(long, default_value_t = DEFAULT_CONTRACT_ADDRESS)]
    default_contract: Address,

    #[arg(long, default_value_t = DEFAULT_GAS_BUDGET)]
    gas: u64,

    /// Periodic refresh of the auction info, 0 disables it
    #[arg(long, default_value_t = DEFAULT_REFRESH_INTERVAL.as_millis() as u64)]
    refresh_interval_ms: u64,

    #[arg(long, default_value = DEFAULT_LOG_DIR)]
    log_dir: PathBuf,
}

impl From<Args> for AppConfig {
    fn from(args: Args) -> Self {
        AppConfig {
            rpc_url: args.rpc_url,
            bidder: args.bidder,
            schema: SchemaSource::parse(&args.abi),
            location: args.location,
            default_contract: args.default_contract,
            gas_budget: args.gas,
            refresh_interval: (args.refresh_interval_ms > 0)
                .then(|| Duration::from_millis(args.refresh_interval_ms)),
            log_dir: args.log_dir,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    let config = AppConfig::from(Args::parse());
    let _log_guard = client::init_tracing(&config.log_dir)?;
    tracing::info!(?config, "starting auction client");
    client::run_app(config).await
}
