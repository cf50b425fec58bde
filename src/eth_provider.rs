//! [`CapabilityProvider`] backed by a websocket connection to an Ethereum node.
//! Transactions are signed by the node (`eth_sendTransaction`), so the
//! configured bidder must be one of its unlocked accounts.

use crate::{
    binding::ContractBinding,
    provider::{
        CapabilityProvider,
        EventStream,
        EventTopic,
        Identity,
        ProviderError,
        RawEvent,
        SubscriptionEvent,
        TransactionId,
        TxOptions,
        render_value,
    },
};
use alloy::{
    dyn_abi::{
        DynSolValue,
        EventExt,
        FunctionExt,
        JsonAbiExt,
    },
    json_abi::Event,
    network::TransactionBuilder,
    primitives::LogData,
    providers::{
        DynProvider,
        Provider,
        ProviderBuilder,
        WsConnect,
    },
    rpc::types::{
        Filter,
        TransactionRequest,
    },
};
use futures::{
    StreamExt,
    stream,
};
use std::collections::BTreeMap;
use tracing::{
    debug,
    info,
};

#[derive(Clone)]
pub struct EthProvider {
    provider: DynProvider,
}

fn rpc_error(err: impl ToString) -> ProviderError {
    ProviderError::Rpc(err.to_string())
}

impl EthProvider {
    pub async fn connect(rpc_url: &str) -> Result<Self, ProviderError> {
        let provider = ProviderBuilder::new()
            .connect_ws(WsConnect::new(rpc_url))
            .await
            .map_err(rpc_error)?
            .erased();
        info!(%rpc_url, "connected to node");
        Ok(Self { provider })
    }
}

impl CapabilityProvider for EthProvider {
    async fn accounts(&self) -> Result<Vec<Identity>, ProviderError> {
        self.provider.get_accounts().await.map_err(rpc_error)
    }

    async fn call(
        &self,
        contract: &ContractBinding,
        method: &str,
        args: &[DynSolValue],
    ) -> Result<Vec<DynSolValue>, ProviderError> {
        let function = contract.function(method)?;
        let input = function
            .abi_encode_input(args)
            .map_err(|e| ProviderError::Encode {
                method: method.to_owned(),
                reason: e.to_string(),
            })?;
        let tx = TransactionRequest::default()
            .with_to(contract.address())
            .with_input(input);

        let output = self.provider.call(tx).await.map_err(rpc_error)?;
        function
            .abi_decode_output(&output)
            .map_err(|e| ProviderError::Decode {
                method: method.to_owned(),
                reason: e.to_string(),
            })
    }

    async fn send(
        &self,
        contract: &ContractBinding,
        method: &str,
        args: &[DynSolValue],
        options: TxOptions,
    ) -> Result<TransactionId, ProviderError> {
        let function = contract.function(method)?;
        let input = function
            .abi_encode_input(args)
            .map_err(|e| ProviderError::Encode {
                method: method.to_owned(),
                reason: e.to_string(),
            })?;
        let tx = TransactionRequest::default()
            .with_from(options.from)
            .with_to(contract.address())
            .with_value(options.value)
            .with_gas_limit(options.gas)
            .with_input(input);

        let pending = self.provider.send_transaction(tx).await.map_err(rpc_error)?;
        debug!(tx_hash = %pending.tx_hash(), method, "transaction submitted");
        let receipt = pending.get_receipt().await.map_err(rpc_error)?;
        let transaction_id = receipt.transaction_hash.to_string();
        if !receipt.status() {
            return Err(ProviderError::Reverted(transaction_id));
        }
        Ok(TransactionId(transaction_id))
    }

    async fn subscribe(
        &self,
        contract: &ContractBinding,
        topic: EventTopic,
    ) -> Result<EventStream, ProviderError> {
        let event = contract.event(topic.event_name())?.clone();
        let filter = Filter::new()
            .address(contract.address())
            .event_signature(event.selector());

        let subscription = self
            .provider
            .subscribe_logs(&filter)
            .await
            .map_err(rpc_error)?;
        let connected = SubscriptionEvent::Connected(subscription.local_id().to_string());
        let events = subscription.into_stream().map(move |log| {
            match decode_fields(&event, log.data()) {
                Ok(fields) => SubscriptionEvent::Data(RawEvent { topic, fields }),
                Err(err) => SubscriptionEvent::Error(err),
            }
        });
        Ok(stream::once(async move { connected }).chain(events).boxed())
    }
}

/// Decodes a log against `event` and renders every parameter under its name.
fn decode_fields(
    event: &Event,
    data: &LogData,
) -> Result<BTreeMap<String, String>, ProviderError> {
    let decoded = event.decode_log(data).map_err(|e| ProviderError::Decode {
        method: event.name.clone(),
        reason: e.to_string(),
    })?;
    let mut indexed = decoded.indexed.iter();
    let mut body = decoded.body.iter();

    let mut fields = BTreeMap::new();
    for param in &event.inputs {
        let value = if param.indexed {
            indexed.next()
        } else {
            body.next()
        };
        if let Some(value) = value {
            fields.insert(param.name.clone(), render_value(value));
        }
    }
    Ok(fields)
}
