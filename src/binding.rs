//! Resolution of the auction contract: schema (ABI) plus address.

use crate::provider::ProviderError;
use alloy::{
    json_abi::{
        Event,
        Function,
        JsonAbi,
    },
    primitives::{
        Address,
        address,
    },
};
use reqwest::StatusCode;
use serde::Deserialize;
use std::{
    fmt,
    path::PathBuf,
    str::FromStr,
    sync::Arc,
};
use thiserror::Error;
use tracing::info;
use url::Url;

pub const DEFAULT_CONTRACT_ADDRESS: Address =
    address!("0xd61AAA6Fe4A77Bfcd293Db089A286805a7700981");
pub const CONTRACT_ID_PARAM: &str = "contractId";

#[derive(Debug, Error)]
pub enum BindError {
    #[error("failed to load contract schema from {location}: {reason}")]
    Fetch { location: String, reason: String },
    #[error("contract schema at {location} is not a valid ABI: {reason}")]
    Parse { location: String, reason: String },
    #[error("invalid contract id `{0}` in location")]
    InvalidContractId(String),
}

/// Where the contract schema is loaded from.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SchemaSource {
    Url(Url),
    File(PathBuf),
}

impl SchemaSource {
    /// `http(s)://` and `file://` values are URLs, anything else is a path.
    pub fn parse(raw: &str) -> Self {
        match Url::parse(raw) {
            Ok(url) if matches!(url.scheme(), "http" | "https" | "file") => {
                SchemaSource::Url(url)
            }
            _ => SchemaSource::File(PathBuf::from(shellexpand::tilde(raw).into_owned())),
        }
    }
}

impl fmt::Display for SchemaSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SchemaSource::Url(url) => write!(f, "{url}"),
            SchemaSource::File(path) => write!(f, "{}", path.display()),
        }
    }
}

/// Schema and address of the bound auction contract. Cloning shares the schema.
#[derive(Clone, Debug)]
pub struct ContractBinding {
    abi: Arc<JsonAbi>,
    address: Address,
}

impl ContractBinding {
    pub fn new(abi: JsonAbi, address: Address) -> Self {
        Self {
            abi: Arc::new(abi),
            address,
        }
    }

    pub fn address(&self) -> Address {
        self.address
    }

    pub fn abi(&self) -> &JsonAbi {
        &self.abi
    }

    pub fn function(&self, name: &str) -> Result<&Function, ProviderError> {
        self.abi
            .function(name)
            .and_then(|overloads| overloads.first())
            .ok_or_else(|| ProviderError::UnknownFunction(name.to_owned()))
    }

    pub fn event(&self, name: &str) -> Result<&Event, ProviderError> {
        self.abi
            .event(name)
            .and_then(|overloads| overloads.first())
            .ok_or_else(|| ProviderError::UnknownEvent(name.to_owned()))
    }
}

#[derive(Deserialize)]
struct Artifact {
    abi: JsonAbi,
}

/// Accepts either a bare ABI array or a compiler artifact carrying an `abi` field.
pub fn parse_schema(bytes: &[u8]) -> Result<JsonAbi, serde_json::Error> {
    match serde_json::from_slice::<JsonAbi>(bytes) {
        Ok(abi) => Ok(abi),
        Err(err) => serde_json::from_slice::<Artifact>(bytes)
            .map(|artifact| artifact.abi)
            .map_err(|_| err),
    }
}

pub async fn load_schema(source: &SchemaSource) -> Result<JsonAbi, BindError> {
    let location = source.to_string();
    let bytes = match source {
        SchemaSource::Url(url) if url.scheme() == "file" => {
            let path = url.to_file_path().map_err(|_| BindError::Fetch {
                location: location.clone(),
                reason: "not a local file URL".into(),
            })?;
            read_file(&location, path).await?
        }
        SchemaSource::Url(url) => fetch_http(&location, url.clone()).await?,
        SchemaSource::File(path) => read_file(&location, path.clone()).await?,
    };
    let abi = parse_schema(&bytes).map_err(|e| BindError::Parse {
        location,
        reason: e.to_string(),
    })?;
    Ok(abi)
}

async fn read_file(location: &str, path: PathBuf) -> Result<Vec<u8>, BindError> {
    tokio::fs::read(&path).await.map_err(|e| BindError::Fetch {
        location: location.to_owned(),
        reason: e.to_string(),
    })
}

async fn fetch_http(location: &str, url: Url) -> Result<Vec<u8>, BindError> {
    let fetch_err = |reason: String| BindError::Fetch {
        location: location.to_owned(),
        reason,
    };
    let res = reqwest::get(url)
        .await
        .map_err(|e| fetch_err(e.to_string()))?;
    let status = res.status();
    let bytes = res.bytes().await.map_err(|e| fetch_err(e.to_string()))?;
    if status != StatusCode::OK {
        return Err(fetch_err(format!(
            "server responded with {status}: {}",
            String::from_utf8_lossy(&bytes)
        )));
    }
    Ok(bytes.to_vec())
}

/// The `contractId` query parameter of the location, if present and non-empty.
pub fn contract_id_from_location(location: &Url) -> Option<String> {
    location
        .query_pairs()
        .find(|(key, _)| key == CONTRACT_ID_PARAM)
        .map(|(_, value)| value.into_owned())
        .filter(|value| !value.is_empty())
}

pub fn resolve_contract_address(
    location: Option<&Url>,
    default_address: Address,
) -> Result<Address, BindError> {
    match location.and_then(contract_id_from_location) {
        Some(contract_id) => {
            info!(%contract_id, "contract id found in location");
            Address::from_str(&contract_id)
                .map_err(|_| BindError::InvalidContractId(contract_id))
        }
        None => {
            info!("no contract id in location, using default address");
            Ok(default_address)
        }
    }
}

/// Loads the schema and pairs it with the address selected by the location.
/// The schema load is the only side effect; a failure there is fatal.
pub async fn bind_contract(
    source: &SchemaSource,
    location: Option<&Url>,
    default_address: Address,
) -> Result<ContractBinding, BindError> {
    let abi = load_schema(source).await?;
    let address = resolve_contract_address(location, default_address)?;
    info!(%address, schema = %source, "contract initialized");
    Ok(ContractBinding::new(abi, address))
}
