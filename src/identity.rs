//! Active bidder identity and owner gating.

use crate::{
    provider::{
        CapabilityProvider,
        Identity,
    },
    session::Session,
    snapshot::{
        ReadError,
        expect_address,
    },
    view::View,
};
use tracing::{
    error,
    info,
};

pub const GET_OWNER: &str = "get_owner";

/// Requests the provider's accounts and fixes the identity to `configured`.
///
/// The account list is only logged. If the provider cannot list accounts the
/// identity stays unset and privileged affordances remain unavailable.
pub async fn resolve_identity<P: CapabilityProvider>(
    provider: &P,
    configured: Identity,
) -> Option<Identity> {
    match provider.accounts().await {
        Ok(accounts) => {
            info!(?accounts, "provider accounts");
            info!(identity = %configured, "active identity");
            Some(configured)
        }
        Err(err) => {
            error!(%err, "failed to initialize account");
            None
        }
    }
}

pub fn owner_operations_visible(identity: Option<Identity>, owner: Identity) -> bool {
    identity == Some(owner)
}

pub async fn fetch_owner<P: CapabilityProvider>(
    session: &Session<P>,
) -> Result<Identity, ReadError> {
    let values = session
        .provider()
        .call(session.binding(), GET_OWNER, &[])
        .await
        .map_err(|source| ReadError::Call {
            method: GET_OWNER,
            source,
        })?;
    expect_address(GET_OWNER, &values)
}

/// Shows the owner operations region only when the active identity owns the
/// auction.
pub async fn apply_owner_gate<P: CapabilityProvider>(
    session: &Session<P>,
    view: &View,
) -> Result<bool, ReadError> {
    let owner = fetch_owner(session).await?;
    let visible = owner_operations_visible(session.identity(), owner);
    view.set_owner_operations_visible(visible);
    info!(%owner, visible, "owner operations gated");
    Ok(visible)
}
