//! In-memory [`CapabilityProvider`] used by the unit and integration tests.

use crate::{
    binding::{
        ContractBinding,
        DEFAULT_CONTRACT_ADDRESS,
        parse_schema,
    },
    provider::{
        CapabilityProvider,
        EventStream,
        EventTopic,
        Identity,
        ProviderError,
        SubscriptionEvent,
        TransactionId,
        TxOptions,
    },
};
use alloy::{
    dyn_abi::DynSolValue,
    primitives::{
        Address,
        U256,
        address,
    },
};
use futures::{
    StreamExt,
    channel::mpsc,
};
use std::{
    collections::{
        BTreeMap,
        HashMap,
    },
    sync::{
        Arc,
        Mutex,
    },
};
use tokio::sync::Semaphore;

pub const AUCTION_ABI: &str = include_str!("../contractABI.json");

pub const BIDDER: Address = address!("0x2f151B7E00e678f347882E9270Ce342bc2B44FF8");
pub const OWNER: Address = address!("0x90F8bf6A479f320ead074411a4B0e7944Ea8c9C1");
pub const RIVAL: Address = address!("0xFFcf8FDEE72ac11b5c542428B35EEF5769C409f0");

pub fn auction_binding() -> ContractBinding {
    let abi = parse_schema(AUCTION_ABI.as_bytes()).expect("bundled ABI is valid");
    ContractBinding::new(abi, DEFAULT_CONTRACT_ADDRESS)
}

pub fn eth(whole: u64) -> U256 {
    U256::from(whole) * U256::from(1_000_000_000_000_000_000u64)
}

pub fn uint(value: U256) -> DynSolValue {
    DynSolValue::Uint(value, 256)
}

#[derive(Clone, Debug, PartialEq)]
pub struct SentTransaction {
    pub method: String,
    pub args: Vec<DynSolValue>,
    pub options: TxOptions,
}

#[derive(Default)]
struct FakeState {
    accounts: Option<Result<Vec<Identity>, ProviderError>>,
    reads: HashMap<String, Result<Vec<DynSolValue>, ProviderError>>,
    read_calls: Vec<(String, Vec<DynSolValue>)>,
    writes: HashMap<String, Result<TransactionId, ProviderError>>,
    sent: Vec<SentTransaction>,
    subscribers: BTreeMap<EventTopic, mpsc::UnboundedSender<SubscriptionEvent>>,
    failing_topics: Vec<EventTopic>,
    gates: HashMap<String, Arc<Semaphore>>,
}

/// Scriptable provider. Reads and writes answer from per-method tables,
/// subscriptions are channels fed through [`FakeProvider::emit`].
#[derive(Clone, Default)]
pub struct FakeProvider {
    state: Arc<Mutex<FakeState>>,
}

impl FakeProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// A provider answering every auction read with a consistent auction.
    pub fn with_auction() -> Self {
        let provider = Self::new();
        provider.set_accounts(Ok(vec![OWNER, BIDDER, RIVAL]));
        provider.set_read("auction_end", vec![uint(U256::from(1_767_225_600u64))]);
        provider.set_read("highestBidder", vec![DynSolValue::Address(RIVAL)]);
        provider.set_read("highestBid", vec![uint(eth(2))]);
        provider.set_read("STATE", vec![DynSolValue::Uint(U256::from(0u8), 8)]);
        provider.set_read(
            "Mycar",
            vec![
                DynSolValue::String("Hyundai".into()),
                DynSolValue::String("12가3456".into()),
            ],
        );
        provider.set_read(
            "bids",
            vec![uint(U256::from(500_000_000_000_000_000u64))],
        );
        provider.set_read("get_owner", vec![DynSolValue::Address(OWNER)]);
        provider
    }

    fn with_state<R>(&self, f: impl FnOnce(&mut FakeState) -> R) -> R {
        let mut state = self.state.lock().unwrap();
        f(&mut state)
    }

    pub fn set_accounts(&self, accounts: Result<Vec<Identity>, ProviderError>) {
        self.with_state(|s| s.accounts = Some(accounts));
    }

    pub fn set_read(&self, method: &str, values: Vec<DynSolValue>) {
        self.with_state(|s| s.reads.insert(method.to_owned(), Ok(values)));
    }

    pub fn fail_read(&self, method: &str, message: &str) {
        self.with_state(|s| {
            s.reads
                .insert(method.to_owned(), Err(ProviderError::Rpc(message.to_owned())))
        });
    }

    pub fn set_write(&self, method: &str, tx_id: &str) {
        self.with_state(|s| {
            s.writes
                .insert(method.to_owned(), Ok(TransactionId(tx_id.to_owned())))
        });
    }

    pub fn fail_write(&self, method: &str, message: &str) {
        self.with_state(|s| {
            s.writes
                .insert(method.to_owned(), Err(ProviderError::Rpc(message.to_owned())))
        });
    }

    pub fn fail_subscription(&self, topic: EventTopic) {
        self.with_state(|s| s.failing_topics.push(topic));
    }

    /// Blocks reads of `method` until [`FakeProvider::release`] is called.
    pub fn hold(&self, method: &str) {
        self.with_state(|s| {
            s.gates
                .insert(method.to_owned(), Arc::new(Semaphore::new(0)))
        });
    }

    pub fn release(&self, method: &str) {
        if let Some(gate) = self.with_state(|s| s.gates.remove(method)) {
            gate.add_permits(1024);
        }
    }

    /// Delivers `event` on the subscription of `topic`. Returns false if no
    /// subscription is open.
    pub fn emit(&self, topic: EventTopic, event: SubscriptionEvent) -> bool {
        self.with_state(|s| {
            s.subscribers
                .get(&topic)
                .map(|tx| tx.unbounded_send(event).is_ok())
                .unwrap_or(false)
        })
    }

    pub fn close_subscriptions(&self) {
        self.with_state(|s| s.subscribers.clear());
    }

    pub fn subscribed_topics(&self) -> Vec<EventTopic> {
        self.with_state(|s| s.subscribers.keys().copied().collect())
    }

    pub fn sent_transactions(&self) -> Vec<SentTransaction> {
        self.with_state(|s| s.sent.clone())
    }

    pub fn read_calls(&self) -> Vec<(String, Vec<DynSolValue>)> {
        self.with_state(|s| s.read_calls.clone())
    }
}

impl CapabilityProvider for FakeProvider {
    async fn accounts(&self) -> Result<Vec<Identity>, ProviderError> {
        self.with_state(|s| s.accounts.clone())
            .unwrap_or_else(|| Ok(Vec::new()))
    }

    async fn call(
        &self,
        contract: &ContractBinding,
        method: &str,
        args: &[DynSolValue],
    ) -> Result<Vec<DynSolValue>, ProviderError> {
        contract.function(method)?;
        let gate = self.with_state(|s| {
            s.read_calls.push((method.to_owned(), args.to_vec()));
            s.gates.get(method).cloned()
        });
        if let Some(gate) = gate {
            let _permit = gate
                .acquire()
                .await
                .map_err(|e| ProviderError::Rpc(e.to_string()))?;
        }
        self.with_state(|s| s.reads.get(method).cloned()).unwrap_or_else(|| {
            Err(ProviderError::Rpc(format!("no fake response for `{method}`")))
        })
    }

    async fn send(
        &self,
        contract: &ContractBinding,
        method: &str,
        args: &[DynSolValue],
        options: TxOptions,
    ) -> Result<TransactionId, ProviderError> {
        contract.function(method)?;
        self.with_state(|s| {
            s.sent.push(SentTransaction {
                method: method.to_owned(),
                args: args.to_vec(),
                options,
            });
            s.writes.get(method).cloned().unwrap_or_else(|| {
                Err(ProviderError::Rpc(format!("no fake response for `{method}`")))
            })
        })
    }

    async fn subscribe(
        &self,
        contract: &ContractBinding,
        topic: EventTopic,
    ) -> Result<EventStream, ProviderError> {
        contract.event(topic.event_name())?;
        self.with_state(|s| {
            if s.failing_topics.contains(&topic) {
                return Err(ProviderError::Rpc(format!("cannot subscribe to {topic}")));
            }
            let (tx, rx) = mpsc::unbounded();
            s.subscribers.insert(topic, tx);
            Ok(rx.boxed())
        })
    }
}
