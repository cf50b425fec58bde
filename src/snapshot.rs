//! Coherent multi-field read of the auction state.

use crate::{
    provider::{
        CapabilityProvider,
        Identity,
        ProviderError,
        render_value,
    },
    session::Session,
    units::format_ether,
    view::{
        Slot,
        View,
    },
};
use alloy::{
    dyn_abi::DynSolValue,
    primitives::{
        Address,
        U256,
    },
};
use thiserror::Error;
use tracing::{
    debug,
    warn,
};

pub const AUCTION_END: &str = "auction_end";
pub const HIGHEST_BIDDER: &str = "highestBidder";
pub const HIGHEST_BID: &str = "highestBid";
pub const STATE: &str = "STATE";
pub const CAR: &str = "Mycar";
pub const BIDS: &str = "bids";

#[derive(Debug, Error)]
pub enum ReadError {
    #[error("read of `{method}` failed: {source}")]
    Call {
        method: &'static str,
        #[source]
        source: ProviderError,
    },
    #[error("unexpected result from `{method}`: {found}")]
    UnexpectedOutput { method: &'static str, found: String },
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AuctionSnapshot {
    pub auction_end_time: U256,
    pub highest_bidder: Address,
    /// Base units.
    pub highest_bid: U256,
    pub auction_state: String,
    pub car_brand: String,
    pub registration_number: String,
    /// Base units; `None` when no identity is active.
    pub caller_bid: Option<U256>,
}

impl AuctionSnapshot {
    /// Slot values of the batched reads, amounts converted to display units.
    pub fn batch_slots(&self) -> [(Slot, String); 6] {
        [
            (Slot::AuctionEnd, self.auction_end_time.to_string()),
            (Slot::HighestBidder, self.highest_bidder.to_string()),
            (Slot::HighestBid, format_ether(self.highest_bid)),
            (Slot::State, self.auction_state.clone()),
            (Slot::CarBrand, self.car_brand.clone()),
            (Slot::RegistrationNumber, self.registration_number.clone()),
        ]
    }
}

/// Reads the auction in one batch and renders it, then reads and renders the
/// caller's own bid.
///
/// The five batched reads are issued concurrently and nothing is rendered
/// unless all of them succeed, so a failed refresh leaves the last good render
/// in place. Errors are logged here as well as returned.
pub async fn refresh_snapshot<P: CapabilityProvider>(
    session: &Session<P>,
    view: &View,
) -> Result<AuctionSnapshot, ReadError> {
    let result = read_and_render(session, view).await;
    if let Err(err) = &result {
        warn!(%err, "failed to update auction info");
    }
    result
}

async fn read_and_render<P: CapabilityProvider>(
    session: &Session<P>,
    view: &View,
) -> Result<AuctionSnapshot, ReadError> {
    let mut snapshot = read_batch(session).await?;
    view.render_all(snapshot.batch_slots());

    match session.identity() {
        Some(identity) => {
            let caller_bid = read_caller_bid(session, identity).await?;
            view.render(Slot::MyBid, format_ether(caller_bid));
            snapshot.caller_bid = Some(caller_bid);
        }
        None => debug!("no active identity, caller bid not read"),
    }
    debug!(?snapshot, "auction info updated");
    Ok(snapshot)
}

async fn read_batch<P: CapabilityProvider>(
    session: &Session<P>,
) -> Result<AuctionSnapshot, ReadError> {
    let (auction_end, highest_bidder, highest_bid, state, car) = futures::try_join!(
        read(session, AUCTION_END, &[]),
        read(session, HIGHEST_BIDDER, &[]),
        read(session, HIGHEST_BID, &[]),
        read(session, STATE, &[]),
        read(session, CAR, &[]),
    )?;
    let (car_brand, registration_number) = car_descriptor(&car)?;

    Ok(AuctionSnapshot {
        auction_end_time: expect_uint(AUCTION_END, &auction_end)?,
        highest_bidder: expect_address(HIGHEST_BIDDER, &highest_bidder)?,
        highest_bid: expect_uint(HIGHEST_BID, &highest_bid)?,
        auction_state: render_value(single(STATE, &state)?),
        car_brand,
        registration_number,
        caller_bid: None,
    })
}

pub async fn read_caller_bid<P: CapabilityProvider>(
    session: &Session<P>,
    identity: Identity,
) -> Result<U256, ReadError> {
    let values = read(session, BIDS, &[DynSolValue::Address(identity)]).await?;
    expect_uint(BIDS, &values)
}

async fn read<P: CapabilityProvider>(
    session: &Session<P>,
    method: &'static str,
    args: &[DynSolValue],
) -> Result<Vec<DynSolValue>, ReadError> {
    session
        .provider()
        .call(session.binding(), method, args)
        .await
        .map_err(|source| ReadError::Call { method, source })
}

fn unexpected(method: &'static str, values: &[DynSolValue]) -> ReadError {
    ReadError::UnexpectedOutput {
        method,
        found: format!("{values:?}"),
    }
}

fn single<'a>(
    method: &'static str,
    values: &'a [DynSolValue],
) -> Result<&'a DynSolValue, ReadError> {
    match values {
        [value] => Ok(value),
        _ => Err(unexpected(method, values)),
    }
}

pub(crate) fn expect_uint(
    method: &'static str,
    values: &[DynSolValue],
) -> Result<U256, ReadError> {
    match single(method, values)? {
        DynSolValue::Uint(value, _) => Ok(*value),
        _ => Err(unexpected(method, values)),
    }
}

pub(crate) fn expect_address(
    method: &'static str,
    values: &[DynSolValue],
) -> Result<Address, ReadError> {
    match single(method, values)? {
        DynSolValue::Address(address) => Ok(*address),
        _ => Err(unexpected(method, values)),
    }
}

/// The car getter yields `(brand, registration number)`, either as two outputs
/// or as one tuple.
fn car_descriptor(values: &[DynSolValue]) -> Result<(String, String), ReadError> {
    match values {
        [brand, number] => Ok((render_value(brand), render_value(number))),
        [DynSolValue::Tuple(members)] => car_descriptor(members),
        _ => Err(unexpected(CAR, values)),
    }
}
