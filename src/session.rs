use crate::{
    binding::ContractBinding,
    provider::{
        CapabilityProvider,
        Identity,
        TxOptions,
    },
};
use alloy::primitives::U256;
use std::sync::Arc;

/// Gas budget passed with every transaction.
pub const DEFAULT_GAS_BUDGET: u64 = 200_000;

/// Everything an operation needs to talk to the auction: the provider, the
/// active identity and the bound contract. Built once during bootstrap.
pub struct Session<P> {
    provider: Arc<P>,
    identity: Option<Identity>,
    binding: ContractBinding,
    gas_budget: u64,
}

impl<P> Clone for Session<P> {
    fn clone(&self) -> Self {
        Self {
            provider: Arc::clone(&self.provider),
            identity: self.identity,
            binding: self.binding.clone(),
            gas_budget: self.gas_budget,
        }
    }
}

impl<P: CapabilityProvider> Session<P> {
    pub fn new(
        provider: Arc<P>,
        identity: Option<Identity>,
        binding: ContractBinding,
    ) -> Self {
        Self {
            provider,
            identity,
            binding,
            gas_budget: DEFAULT_GAS_BUDGET,
        }
    }

    pub fn with_gas_budget(mut self, gas_budget: u64) -> Self {
        self.gas_budget = gas_budget;
        self
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    pub fn identity(&self) -> Option<Identity> {
        self.identity
    }

    pub fn binding(&self) -> &ContractBinding {
        &self.binding
    }

    pub fn gas_budget(&self) -> u64 {
        self.gas_budget
    }

    /// Transaction options sent on behalf of the active identity, if any.
    pub fn tx_options(&self, value: U256) -> Option<TxOptions> {
        self.identity.map(|from| TxOptions {
            from,
            value,
            gas: self.gas_budget,
        })
    }
}
