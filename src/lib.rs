pub mod binding;
pub mod bootstrap;
pub mod commands;
pub mod config;
pub mod eth_provider;
pub mod events;
pub mod identity;
pub mod provider;
pub mod session;
pub mod snapshot;
pub mod units;
pub mod view;

#[cfg(any(test, feature = "test-helpers"))]
pub mod test_helpers;
