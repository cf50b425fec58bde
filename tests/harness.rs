#![allow(non_snake_case)]

use alloy::primitives::U256;
use auction_dapp::{
    binding::SchemaSource,
    bootstrap::{
        Running,
        bootstrap,
    },
    commands::{
        Command,
        CommandOutcome,
        FailureKind,
    },
    config::AppConfig,
    provider::{
        EventTopic,
        RawEvent,
        SubscriptionEvent,
    },
    snapshot::refresh_snapshot,
    test_helpers::*,
    view::{
        Alert,
        Slot,
        View,
    },
};
use std::sync::Arc;
use tempdir::TempDir;
use url::Url;

struct TestContext {
    provider: FakeProvider,
    view: View,
    _dir: TempDir,
    config: AppConfig,
}

impl TestContext {
    fn new() -> Self {
        let dir = TempDir::new("auction").unwrap();
        let path = dir.path().join("contractABI.json");
        std::fs::write(&path, AUCTION_ABI).unwrap();
        Self {
            provider: FakeProvider::with_auction(),
            view: View::new(),
            config: AppConfig {
                schema: SchemaSource::File(path),
                ..AppConfig::default()
            },
            _dir: dir,
        }
    }

    async fn start(&self) -> Running<FakeProvider> {
        bootstrap(Arc::new(self.provider.clone()), &self.config, &self.view)
            .await
            .unwrap()
    }
}

async fn settle() {
    for _ in 0..50 {
        tokio::task::yield_now().await;
    }
}

#[tokio::test]
async fn session__event_patch_is_overwritten_by_next_refresh() {
    let ctx = TestContext::new();
    let running = ctx.start().await;
    // given
    assert_eq!(ctx.view.get(Slot::State).as_deref(), Some("0"));
    ctx.provider.emit(
        EventTopic::WithdrawalStateChanged,
        SubscriptionEvent::Data(RawEvent::new(
            EventTopic::WithdrawalStateChanged,
            [("newState", "2")],
        )),
    );
    settle().await;
    assert_eq!(ctx.view.get(Slot::State).as_deref(), Some("2"));

    // when
    ctx.provider
        .set_read("STATE", vec![alloy::dyn_abi::DynSolValue::Uint(U256::from(1u8), 8)]);
    refresh_snapshot(&running.session, &ctx.view).await.unwrap();

    // then
    assert_eq!(ctx.view.get(Slot::State).as_deref(), Some("1"));
}

#[tokio::test]
async fn session__bid_event_reaches_activity_log_in_base_units() {
    let ctx = TestContext::new();
    let _running = ctx.start().await;

    ctx.provider.emit(
        EventTopic::BidPlaced,
        SubscriptionEvent::Data(RawEvent::new(
            EventTopic::BidPlaced,
            [("highestBidder", "0xEE"), ("highestBid", "2000000000000000000")],
        )),
    );
    settle().await;

    let line = ctx.view.get(Slot::EventsLog).unwrap();
    assert!(line.contains("0xEE"));
    assert!(line.contains("2000000000000000000"));
    assert_eq!(ctx.view.get(Slot::HighestBid).as_deref(), Some("2"));
}

#[tokio::test]
async fn session__rejected_bid_alerts_and_keeps_auction_info() {
    // given
    let ctx = TestContext::new();
    ctx.provider
        .fail_write("bid", "VM Exception while processing transaction: revert curr_maximum");
    let running = ctx.start().await;
    let before = ctx.view.get(Slot::HighestBidder);
    ctx.view.set_bid_input("5");

    // when
    let outcome = running.dispatcher.trigger(Command::Bid).await.unwrap();

    // then
    assert!(matches!(
        outcome,
        CommandOutcome::Failure {
            kind: FailureKind::AlreadyHighestBidder,
            ..
        }
    ));
    assert_eq!(
        ctx.view.state().current_alert(),
        Some(&Alert::new("You are already the highest bidder."))
    );
    assert_eq!(ctx.view.get(Slot::HighestBidder), before);
    let sent = ctx.provider.sent_transactions();
    assert_eq!(sent[0].options.from, BIDDER);
    assert_eq!(sent[0].options.value, eth(5));
}

#[tokio::test]
async fn session__owner_cancels_auction() {
    // given
    let mut ctx = TestContext::new();
    ctx.config.bidder = OWNER;
    ctx.provider.set_write("cancel_auction", "0xc0ffee");
    let running = ctx.start().await;
    assert!(ctx.view.owner_operations_visible());

    // when
    let outcome = running
        .dispatcher
        .trigger(Command::CancelAuction)
        .await
        .unwrap();
    ctx.provider.emit(
        EventTopic::Canceled,
        SubscriptionEvent::Data(RawEvent::new(
            EventTopic::Canceled,
            [("message", "Auction canceled"), ("time", "1767225600")],
        )),
    );
    settle().await;

    // then
    assert!(outcome.is_success());
    assert_eq!(ctx.provider.sent_transactions()[0].options.from, OWNER);
    assert_eq!(
        ctx.view.get(Slot::EventsLog).as_deref(),
        Some("Auction canceled at 1767225600")
    );
}

#[tokio::test]
async fn session__location_selects_contract() {
    // given
    let mut ctx = TestContext::new();
    ctx.config.location = Some(
        Url::parse("http://localhost:3000/?contractId=0xFFcf8FDEE72ac11b5c542428B35EEF5769C409f0")
            .unwrap(),
    );

    // when
    let running = ctx.start().await;

    // then
    assert_eq!(running.session.binding().address(), RIVAL);
}

#[tokio::test]
async fn session__shutdown_closes_every_subscription() {
    let ctx = TestContext::new();
    let running = ctx.start().await;
    assert_eq!(running.events.active_topics().len(), 3);

    running.events.shutdown();
    settle().await;

    for topic in EventTopic::ALL {
        assert!(!ctx.provider.emit(
            topic,
            SubscriptionEvent::Connected("0x1".into())
        ));
    }
}
