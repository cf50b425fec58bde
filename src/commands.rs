//! The three state-changing commands: bid, cancel and withdraw.
//!
//! Every command is a one-shot attempt. It is never retried and repeated
//! triggers are not merged; each resolves to exactly one [`CommandOutcome`]
//! which is rendered (or, for cancel, logged).

use crate::{
    provider::{
        CapabilityProvider,
        TransactionId,
    },
    session::Session,
    units::parse_ether,
    view::{
        Alert,
        Slot,
        View,
    },
};
use alloy::primitives::U256;
use tokio::task::JoinHandle;
use tracing::{
    error,
    info,
    warn,
};


pub const BID: &str = "bid";
pub const CANCEL_AUCTION: &str = "cancel_auction";
pub const WITHDRAW: &str = "withdraw";

const NOT_ENOUGH: &str = "not_enough";
const CURR_MAXIMUM: &str = "curr_maximum";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FailureKind {
    BidTooLow,
    AlreadyHighestBidder,
    Unclassified,
}

impl FailureKind {
    /// Classifies a failure by the revert reason embedded in its message.
    // TODO: switch to structured revert data once the provider exposes it; the
    // node currently only reports the reason inside the message text.
    pub fn classify(message: &str) -> Self {
        if message.contains(NOT_ENOUGH) {
            FailureKind::BidTooLow
        } else if message.contains(CURR_MAXIMUM) {
            FailureKind::AlreadyHighestBidder
        } else {
            FailureKind::Unclassified
        }
    }

    pub fn alert_message(self) -> &'static str {
        match self {
            FailureKind::BidTooLow => "Your bid is lower than the current highest bid.",
            FailureKind::AlreadyHighestBidder => "You are already the highest bidder.",
            FailureKind::Unclassified => "An error occurred. Check the log for details.",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CommandOutcome {
    Success { transaction_id: TransactionId },
    Failure { kind: FailureKind, message: String },
}

impl CommandOutcome {
    fn failure(message: impl Into<String>) -> Self {
        let message = message.into();
        CommandOutcome::Failure {
            kind: FailureKind::classify(&message),
            message,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, CommandOutcome::Success { .. })
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Command {
    Bid,
    CancelAuction,
    Withdraw,
}

pub struct CommandDispatcher<P> {
    session: Session<P>,
    view: View,
}

impl<P> Clone for CommandDispatcher<P> {
    fn clone(&self) -> Self {
        Self {
            session: self.session.clone(),
            view: self.view.clone(),
        }
    }
}

impl<P: CapabilityProvider> CommandDispatcher<P> {
    pub fn new(session: Session<P>, view: View) -> Self {
        Self { session, view }
    }

    pub fn session(&self) -> &Session<P> {
        &self.session
    }

    /// Starts `command` in the background. Every call is a new attempt.
    pub fn trigger(&self, command: Command) -> JoinHandle<CommandOutcome> {
        let dispatcher = self.clone();
        tokio::spawn(async move { dispatcher.dispatch(command).await })
    }

    pub async fn dispatch(&self, command: Command) -> CommandOutcome {
        match command {
            Command::Bid => self.bid().await,
            Command::CancelAuction => self.cancel_auction().await,
            Command::Withdraw => self.withdraw().await,
        }
    }

    /// Bids the amount currently typed in the bid input.
    pub async fn bid(&self) -> CommandOutcome {
        let amount = self.view.bid_input();
        self.bid_amount(&amount).await
    }

    /// Bids `amount` display units.
    pub async fn bid_amount(&self, amount: &str) -> CommandOutcome {
        let outcome = match parse_ether(amount) {
            Ok(value) => self.send(BID, value).await,
            Err(err) => CommandOutcome::failure(err.to_string()),
        };
        match &outcome {
            CommandOutcome::Success { transaction_id } => {
                info!(%transaction_id, %amount, "bid placed");
                self.view.render(
                    Slot::BiddingStatus,
                    format!("Successful bid, transaction ID: {transaction_id}"),
                );
            }
            CommandOutcome::Failure { kind, message } => {
                if *kind == FailureKind::Unclassified {
                    error!(%message, "bid failed");
                } else {
                    warn!(?kind, %message, "bid rejected");
                }
                self.view.alert(Alert::new(kind.alert_message()));
                self.view
                    .render(Slot::BiddingStatus, format!("Bid failed: {message}"));
            }
        }
        outcome
    }

    /// Owner-only in the UI; the contract is the authority, so nothing is
    /// checked here.
    pub async fn cancel_auction(&self) -> CommandOutcome {
        let outcome = self.send(CANCEL_AUCTION, U256::ZERO).await;
        match &outcome {
            CommandOutcome::Success { transaction_id } => {
                info!(%transaction_id, "auction canceled");
            }
            CommandOutcome::Failure { message, .. } => {
                error!(%message, "failed to cancel auction");
            }
        }
        outcome
    }

    pub async fn withdraw(&self) -> CommandOutcome {
        let outcome = self.send(WITHDRAW, U256::ZERO).await;
        let status = match &outcome {
            CommandOutcome::Success { transaction_id } => {
                info!(%transaction_id, "withdrawal sent");
                format!("Withdraw successful, transaction ID: {transaction_id}")
            }
            CommandOutcome::Failure { message, .. } => {
                error!(%message, "withdraw failed");
                format!("Withdraw failed: {message}")
            }
        };
        self.view.render(Slot::WithdrawStatus, status);
        outcome
    }

    async fn send(&self, method: &str, value: U256) -> CommandOutcome {
        let Some(options) = self.session.tx_options(value) else {
            return CommandOutcome::failure("no active identity; transaction not sent");
        };
        match self
            .session
            .provider()
            .send(self.session.binding(), method, &[], options)
            .await
        {
            Ok(transaction_id) => CommandOutcome::Success { transaction_id },
            Err(err) => CommandOutcome::failure(err.to_string()),
        }
    }
}
