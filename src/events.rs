//! Contract event subscriptions and the view patches they apply.

use crate::{
    provider::{
        CapabilityProvider,
        EventStream,
        EventTopic,
        RawEvent,
        SubscriptionEvent,
    },
    session::Session,
    view::{
        Slot,
        View,
    },
};
use futures::StreamExt;
use thiserror::Error;
use tokio::task::JoinHandle;
use tracing::{
    debug,
    error,
    info,
    warn,
};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DomainEvent {
    BidPlaced {
        highest_bidder: String,
        highest_bid: String,
    },
    Canceled {
        message: String,
        time: String,
    },
    WithdrawalStateChanged {
        new_state: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{topic} event has no `{field}` field")]
pub struct EventDecodeError {
    pub topic: EventTopic,
    pub field: &'static str,
}

impl TryFrom<&RawEvent> for DomainEvent {
    type Error = EventDecodeError;

    fn try_from(raw: &RawEvent) -> Result<Self, Self::Error> {
        let field = |name: &'static str| {
            raw.field(name)
                .map(str::to_owned)
                .ok_or(EventDecodeError {
                    topic: raw.topic,
                    field: name,
                })
        };
        let event = match raw.topic {
            EventTopic::BidPlaced => DomainEvent::BidPlaced {
                highest_bidder: field("highestBidder")?,
                highest_bid: field("highestBid")?,
            },
            EventTopic::Canceled => DomainEvent::Canceled {
                message: field("message")?,
                time: field("time")?,
            },
            EventTopic::WithdrawalStateChanged => DomainEvent::WithdrawalStateChanged {
                new_state: field("newState")?,
            },
        };
        Ok(event)
    }
}

impl DomainEvent {
    /// Patches the slot this event owns. Bid amounts are shown as delivered,
    /// in base units.
    pub fn apply(&self, view: &View) {
        match self {
            DomainEvent::BidPlaced {
                highest_bidder,
                highest_bid,
            } => view.render(
                Slot::EventsLog,
                format!("{highest_bidder} has bid ({highest_bid} wei)"),
            ),
            DomainEvent::Canceled { message, time } => {
                view.render(Slot::EventsLog, format!("{message} at {time}"))
            }
            DomainEvent::WithdrawalStateChanged { new_state } => {
                view.render(Slot::State, new_state.clone());
                info!(%new_state, "auction state updated");
            }
        }
    }
}

pub fn handle_subscription_event(topic: EventTopic, event: SubscriptionEvent, view: &View) {
    match event {
        SubscriptionEvent::Connected(subscription_id) => {
            info!(%topic, %subscription_id, "subscription connected");
        }
        SubscriptionEvent::Data(raw) => match DomainEvent::try_from(&raw) {
            Ok(event) => {
                debug!(%topic, ?event, "event received");
                event.apply(view);
            }
            Err(err) => warn!(%err, "dropping undecodable event"),
        },
        SubscriptionEvent::Error(err) => {
            error!(%topic, %err, "subscription error");
        }
    }
}

async fn run_subscription(topic: EventTopic, mut stream: EventStream, view: View) {
    while let Some(event) = stream.next().await {
        handle_subscription_event(topic, event, &view);
    }
    warn!(%topic, "subscription stream ended");
}

/// One task per topic, each applying patches as events arrive. Streams are
/// independent: an error on one is logged and leaves the others running.
/// Dropping the synchronizer tears every subscription down.
pub struct EventSynchronizer {
    tasks: Vec<(EventTopic, JoinHandle<()>)>,
}

impl EventSynchronizer {
    pub async fn start<P: CapabilityProvider>(session: &Session<P>, view: &View) -> Self {
        let mut tasks = Vec::with_capacity(EventTopic::ALL.len());
        for topic in EventTopic::ALL {
            match session.provider().subscribe(session.binding(), topic).await {
                Ok(stream) => {
                    let task = tokio::spawn(run_subscription(topic, stream, view.clone()));
                    tasks.push((topic, task));
                }
                Err(err) => error!(%topic, %err, "failed to subscribe"),
            }
        }
        Self { tasks }
    }

    /// Topics whose subscription task is still running.
    pub fn active_topics(&self) -> Vec<EventTopic> {
        self.tasks
            .iter()
            .filter(|(_, task)| !task.is_finished())
            .map(|(topic, _)| *topic)
            .collect()
    }

    pub fn shutdown(self) {
        drop(self);
    }
}

impl Drop for EventSynchronizer {
    fn drop(&mut self) {
        for (topic, task) in self.tasks.drain(..) {
            task.abort();
            debug!(%topic, "subscription torn down");
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(non_snake_case)]
    use super::*;
    use crate::{
        provider::ProviderError,
        test_helpers::{
            BIDDER,
            FakeProvider,
            auction_binding,
        },
    };
    use std::sync::Arc;

    async fn wait_until(mut condition: impl FnMut() -> bool) {
        for _ in 0..100 {
            if condition() {
                return;
            }
            tokio::task::yield_now().await;
        }
        panic!("condition not reached");
    }

    fn bid_placed(bidder: &str, amount: &str) -> SubscriptionEvent {
        SubscriptionEvent::Data(RawEvent::new(
            EventTopic::BidPlaced,
            [("highestBidder", bidder), ("highestBid", amount)],
        ))
    }

    fn withdrawal(state: &str) -> SubscriptionEvent {
        SubscriptionEvent::Data(RawEvent::new(
            EventTopic::WithdrawalStateChanged,
            [("newState", state)],
        ))
    }

    async fn started(provider: &FakeProvider, view: &View) -> EventSynchronizer {
        let session = Session::new(Arc::new(provider.clone()), Some(BIDDER), auction_binding());
        EventSynchronizer::start(&session, view).await
    }

    #[test]
    fn domain_event__decodes_named_fields() {
        let raw = RawEvent::new(
            EventTopic::Canceled,
            [("message", "Auction canceled"), ("time", "1767225600")],
        );

        assert_eq!(
            DomainEvent::try_from(&raw).unwrap(),
            DomainEvent::Canceled {
                message: "Auction canceled".into(),
                time: "1767225600".into(),
            }
        );
    }

    #[test]
    fn domain_event__reports_missing_field() {
        let raw = RawEvent::new(EventTopic::BidPlaced, [("highestBidder", "0xEE")]);

        assert_eq!(
            DomainEvent::try_from(&raw).unwrap_err(),
            EventDecodeError {
                topic: EventTopic::BidPlaced,
                field: "highestBid",
            }
        );
    }

    #[test]
    fn apply__bid_placed_renders_raw_wei_in_activity_log() {
        // given
        let view = View::new();
        view.render(Slot::HighestBid, "1");
        let event = DomainEvent::BidPlaced {
            highest_bidder: "0xEE".into(),
            highest_bid: "2000000000000000000".into(),
        };

        // when
        event.apply(&view);

        // then
        let line = view.get(Slot::EventsLog).unwrap();
        assert!(line.contains("0xEE"));
        assert!(line.contains("2000000000000000000"));
        assert_eq!(view.get(Slot::HighestBid).as_deref(), Some("1"));
    }

    #[test]
    fn apply__withdrawal_changes_only_lifecycle_state() {
        // given
        let view = View::new();
        view.render_all([
            (Slot::HighestBidder, "0xEE".to_string()),
            (Slot::HighestBid, "2".to_string()),
            (Slot::CarBrand, "Hyundai".to_string()),
            (Slot::MyBid, "0.5".to_string()),
            (Slot::State, "0".to_string()),
        ]);
        let before = view.state();

        // when
        DomainEvent::WithdrawalStateChanged {
            new_state: "2".into(),
        }
        .apply(&view);

        // then
        let after = view.state();
        for slot in Slot::ALL {
            if slot == Slot::State {
                assert_eq!(after.slot(slot), Some("2"));
            } else {
                assert_eq!(after.slot(slot), before.slot(slot), "{slot} changed");
            }
        }
        assert_eq!(after.owner_operations_visible(), before.owner_operations_visible());
    }

    #[test]
    fn apply__canceled_overwrites_activity_log() {
        let view = View::new();
        view.render(Slot::EventsLog, "0xEE has bid (1 wei)");

        DomainEvent::Canceled {
            message: "Auction canceled by owner".into(),
            time: "1767225600".into(),
        }
        .apply(&view);

        assert_eq!(
            view.get(Slot::EventsLog).as_deref(),
            Some("Auction canceled by owner at 1767225600")
        );
    }

    #[tokio::test]
    async fn start__subscribes_to_every_topic() {
        let provider = FakeProvider::with_auction();
        let view = View::new();

        let sync = started(&provider, &view).await;

        assert_eq!(provider.subscribed_topics(), EventTopic::ALL.to_vec());
        assert_eq!(sync.active_topics(), EventTopic::ALL.to_vec());
    }

    #[tokio::test]
    async fn start__patches_view_as_events_arrive() {
        // given
        let provider = FakeProvider::with_auction();
        let view = View::new();
        let _sync = started(&provider, &view).await;

        // when
        provider.emit(
            EventTopic::BidPlaced,
            SubscriptionEvent::Connected("0x1".into()),
        );
        provider.emit(EventTopic::BidPlaced, bid_placed("0xEE", "2000000000000000000"));
        provider.emit(EventTopic::WithdrawalStateChanged, withdrawal("2"));

        // then
        wait_until(|| view.get(Slot::State).as_deref() == Some("2")).await;
        wait_until(|| {
            view.get(Slot::EventsLog).as_deref()
                == Some("0xEE has bid (2000000000000000000 wei)")
        })
        .await;
    }

    #[tokio::test]
    async fn start__keeps_sibling_streams_alive_after_an_error() {
        // given
        let provider = FakeProvider::with_auction();
        let view = View::new();
        let sync = started(&provider, &view).await;

        // when
        provider.emit(
            EventTopic::Canceled,
            SubscriptionEvent::Error(ProviderError::Rpc("socket hang up".into())),
        );
        provider.emit(EventTopic::BidPlaced, bid_placed("0xAA", "1"));

        // then
        wait_until(|| view.get(Slot::EventsLog).is_some()).await;
        assert_eq!(sync.active_topics(), EventTopic::ALL.to_vec());
        provider.emit(
            EventTopic::Canceled,
            SubscriptionEvent::Data(RawEvent::new(
                EventTopic::Canceled,
                [("message", "closed"), ("time", "7")],
            )),
        );
        wait_until(|| view.get(Slot::EventsLog).as_deref() == Some("closed at 7")).await;
    }

    #[tokio::test]
    async fn start__continues_when_one_subscription_cannot_be_opened() {
        let provider = FakeProvider::with_auction();
        provider.fail_subscription(EventTopic::Canceled);
        let view = View::new();

        let sync = started(&provider, &view).await;

        assert_eq!(
            sync.active_topics(),
            vec![EventTopic::BidPlaced, EventTopic::WithdrawalStateChanged]
        );
        provider.emit(EventTopic::WithdrawalStateChanged, withdrawal("1"));
        wait_until(|| view.get(Slot::State).as_deref() == Some("1")).await;
    }

    #[tokio::test]
    async fn shutdown__stops_applying_patches() {
        // given
        let provider = FakeProvider::with_auction();
        let view = View::new();
        let sync = started(&provider, &view).await;

        // when
        sync.shutdown();
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }
        provider.emit(EventTopic::WithdrawalStateChanged, withdrawal("3"));
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }

        // then
        assert_eq!(view.get(Slot::State), None);
    }
}
