use crate::{
    binding::{
        DEFAULT_CONTRACT_ADDRESS,
        SchemaSource,
    },
    provider::Identity,
    session::DEFAULT_GAS_BUDGET,
};
use alloy::primitives::{
    Address,
    address,
};
use std::{
    path::PathBuf,
    time::Duration,
};
use url::Url;

pub const DEFAULT_RPC_URL: &str = "ws://localhost:7545";
pub const DEFAULT_BIDDER: Address = address!("0x2f151B7E00e678f347882E9270Ce342bc2B44FF8");
pub const DEFAULT_SCHEMA: &str = "contractABI.json";
pub const DEFAULT_REFRESH_INTERVAL: Duration = Duration::from_millis(5_000);
pub const DEFAULT_LOG_DIR: &str = ".logs";

#[derive(Clone, Debug)]
pub struct AppConfig {
    /// Websocket endpoint of the node.
    pub rpc_url: String,
    /// Identity every transaction is sent from.
    pub bidder: Identity,
    pub schema: SchemaSource,
    /// Location whose `contractId` query parameter selects the contract.
    pub location: Option<Url>,
    pub default_contract: Address,
    pub gas_budget: u64,
    /// `None` disables the periodic snapshot refresh.
    pub refresh_interval: Option<Duration>,
    pub log_dir: PathBuf,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            rpc_url: DEFAULT_RPC_URL.to_string(),
            bidder: DEFAULT_BIDDER,
            schema: SchemaSource::parse(DEFAULT_SCHEMA),
            location: None,
            default_contract: DEFAULT_CONTRACT_ADDRESS,
            gas_budget: DEFAULT_GAS_BUDGET,
            refresh_interval: Some(DEFAULT_REFRESH_INTERVAL),
            log_dir: PathBuf::from(DEFAULT_LOG_DIR),
        }
    }
}
