//! Deterministic startup: identity, binding, first snapshot, owner gate,
//! subscriptions, then command wiring.

use crate::{
    binding::{
        BindError,
        bind_contract,
    },
    commands::CommandDispatcher,
    config::AppConfig,
    events::EventSynchronizer,
    identity::{
        apply_owner_gate,
        resolve_identity,
    },
    provider::CapabilityProvider,
    session::Session,
    snapshot::{
        ReadError,
        refresh_snapshot,
    },
    view::View,
};
use std::sync::Arc;
use thiserror::Error;
use tracing::{
    error,
    info,
};


#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error(transparent)]
    Bind(#[from] BindError),
    #[error("failed to read auction owner: {0}")]
    Owner(#[source] ReadError),
}

/// A fully initialized session with live subscriptions and wired commands.
pub struct Running<P> {
    pub session: Session<P>,
    pub dispatcher: CommandDispatcher<P>,
    pub events: EventSynchronizer,
    pub owner_operations_visible: bool,
}

/// Runs the startup sequence. A failing step aborts the ones after it; the
/// steps already taken are not undone.
pub async fn bootstrap<P: CapabilityProvider>(
    provider: Arc<P>,
    config: &AppConfig,
    view: &View,
) -> Result<Running<P>, BootstrapError> {
    let result = run_steps(provider, config, view).await;
    if let Err(err) = &result {
        error!(%err, "initialization failed");
    }
    result
}

async fn run_steps<P: CapabilityProvider>(
    provider: Arc<P>,
    config: &AppConfig,
    view: &View,
) -> Result<Running<P>, BootstrapError> {
    let identity = resolve_identity(provider.as_ref(), config.bidder).await;

    let binding = bind_contract(
        &config.schema,
        config.location.as_ref(),
        config.default_contract,
    )
    .await?;
    let session =
        Session::new(provider, identity, binding).with_gas_budget(config.gas_budget);

    // read failures only cost the first render
    if refresh_snapshot(&session, view).await.is_err() {
        info!("continuing without initial auction info");
    }

    let owner_operations_visible = apply_owner_gate(&session, view)
        .await
        .map_err(BootstrapError::Owner)?;

    let events = EventSynchronizer::start(&session, view).await;
    let dispatcher = CommandDispatcher::new(session.clone(), view.clone());
    info!(
        contract = %session.binding().address(),
        owner_operations_visible,
        "auction client ready"
    );

    Ok(Running {
        session,
        dispatcher,
        events,
        owner_operations_visible,
    })
}
