//! The narrow capability surface the client consumes: accounts, read calls,
//! transactions and event subscriptions. Everything network-bound goes through
//! [`CapabilityProvider`].

use crate::binding::ContractBinding;
use alloy::{
    dyn_abi::DynSolValue,
    primitives::{
        Address,
        U256,
        hex,
    },
};
use futures::stream::BoxStream;
use std::{
    collections::BTreeMap,
    fmt,
};
use thiserror::Error;

/// Address of the connected bidder.
pub type Identity = Address;

pub type EventStream = BoxStream<'static, SubscriptionEvent>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProviderError {
    /// Raw error reported by the node. The message is kept verbatim since
    /// command failures are classified by its content.
    #[error("{0}")]
    Rpc(String),
    #[error("contract schema has no function `{0}`")]
    UnknownFunction(String),
    #[error("contract schema has no event `{0}`")]
    UnknownEvent(String),
    #[error("failed to encode arguments for `{method}`: {reason}")]
    Encode { method: String, reason: String },
    #[error("failed to decode result of `{method}`: {reason}")]
    Decode { method: String, reason: String },
    #[error("transaction {0} reverted")]
    Reverted(String),
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct TransactionId(pub String);

impl fmt::Display for TransactionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TxOptions {
    pub from: Identity,
    pub value: U256,
    pub gas: u64,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EventTopic {
    BidPlaced,
    Canceled,
    WithdrawalStateChanged,
}

impl EventTopic {
    pub const ALL: [EventTopic; 3] = [
        EventTopic::BidPlaced,
        EventTopic::Canceled,
        EventTopic::WithdrawalStateChanged,
    ];

    /// Name of the event in the contract schema.
    pub fn event_name(self) -> &'static str {
        match self {
            EventTopic::BidPlaced => "BidEvent",
            EventTopic::Canceled => "CanceledEvent",
            EventTopic::WithdrawalStateChanged => "WithdrawalEvent",
        }
    }
}

impl fmt::Display for EventTopic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.event_name())
    }
}

/// A delivered event with its parameters rendered by name.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RawEvent {
    pub topic: EventTopic,
    pub fields: BTreeMap<String, String>,
}

impl RawEvent {
    pub fn new<K, V>(topic: EventTopic, fields: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            topic,
            fields: fields
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str)
    }
}

/// Lifecycle notifications of a single topic subscription.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SubscriptionEvent {
    Connected(String),
    Data(RawEvent),
    Error(ProviderError),
}

pub trait CapabilityProvider: Send + Sync + 'static {
    fn accounts(&self) -> impl Future<Output = Result<Vec<Identity>, ProviderError>> + Send;

    /// Read-only call; returns the decoded outputs of `method`.
    fn call(
        &self,
        contract: &ContractBinding,
        method: &str,
        args: &[DynSolValue],
    ) -> impl Future<Output = Result<Vec<DynSolValue>, ProviderError>> + Send;

    /// State-changing call; resolves once the transaction receipt is available.
    fn send(
        &self,
        contract: &ContractBinding,
        method: &str,
        args: &[DynSolValue],
        options: TxOptions,
    ) -> impl Future<Output = Result<TransactionId, ProviderError>> + Send;

    fn subscribe(
        &self,
        contract: &ContractBinding,
        topic: EventTopic,
    ) -> impl Future<Output = Result<EventStream, ProviderError>> + Send;
}

/// Renders a decoded ABI value the way it is shown to the user: integers in
/// decimal, addresses checksummed, bytes as 0x-prefixed hex.
pub fn render_value(value: &DynSolValue) -> String {
    match value {
        DynSolValue::Bool(b) => b.to_string(),
        DynSolValue::Int(i, _) => i.to_string(),
        DynSolValue::Uint(u, _) => u.to_string(),
        DynSolValue::Address(address) => address.to_string(),
        DynSolValue::String(s) => s.clone(),
        DynSolValue::FixedBytes(word, size) => hex::encode_prefixed(&word[..*size]),
        DynSolValue::Bytes(bytes) => hex::encode_prefixed(bytes),
        DynSolValue::Array(items)
        | DynSolValue::FixedArray(items)
        | DynSolValue::Tuple(items) => {
            let rendered: Vec<String> = items.iter().map(render_value).collect();
            format!("[{}]", rendered.join(", "))
        }
        other => format!("{other:?}"),
    }
}
