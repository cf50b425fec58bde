//! The rendered view: named display slots shared by every writer.
//!
//! Snapshot refreshes, event patches and command results all write here
//! concurrently. Each write touches only the slots it names and the last write
//! to a slot wins.

use std::{
    collections::{
        BTreeMap,
        VecDeque,
    },
    fmt,
    sync::{
        Arc,
        Mutex,
        PoisonError,
    },
};
use tokio::sync::Notify;

const MAX_PENDING_ALERTS: usize = 8;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Slot {
    AuctionEnd,
    HighestBidder,
    HighestBid,
    State,
    CarBrand,
    RegistrationNumber,
    MyBid,
    EventsLog,
    BiddingStatus,
    WithdrawStatus,
}

impl Slot {
    pub const ALL: [Slot; 10] = [
        Slot::AuctionEnd,
        Slot::HighestBidder,
        Slot::HighestBid,
        Slot::State,
        Slot::CarBrand,
        Slot::RegistrationNumber,
        Slot::MyBid,
        Slot::EventsLog,
        Slot::BiddingStatus,
        Slot::WithdrawStatus,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Slot::AuctionEnd => "Auction end",
            Slot::HighestBidder => "Highest bidder",
            Slot::HighestBid => "Highest bid (ETH)",
            Slot::State => "State",
            Slot::CarBrand => "Car brand",
            Slot::RegistrationNumber => "Registration number",
            Slot::MyBid => "My bid (ETH)",
            Slot::EventsLog => "Activity",
            Slot::BiddingStatus => "Bid status",
            Slot::WithdrawStatus => "Withdraw status",
        }
    }
}

impl fmt::Display for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A message that must be acknowledged by the user.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Alert {
    pub message: String,
}

impl Alert {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ViewState {
    slots: BTreeMap<Slot, String>,
    owner_operations_visible: bool,
    bid_input: String,
    alerts: VecDeque<Alert>,
}

impl ViewState {
    pub fn slot(&self, slot: Slot) -> Option<&str> {
        self.slots.get(&slot).map(String::as_str)
    }

    pub fn owner_operations_visible(&self) -> bool {
        self.owner_operations_visible
    }

    pub fn bid_input(&self) -> &str {
        &self.bid_input
    }

    pub fn current_alert(&self) -> Option<&Alert> {
        self.alerts.front()
    }
}

/// Cheaply cloneable handle to the shared view.
#[derive(Clone, Debug, Default)]
pub struct View {
    state: Arc<Mutex<ViewState>>,
    changed: Arc<Notify>,
}

impl View {
    pub fn new() -> Self {
        Self::default()
    }

    fn update<R>(&self, f: impl FnOnce(&mut ViewState) -> R) -> R {
        let result = {
            let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
            f(&mut state)
        };
        self.changed.notify_one();
        result
    }

    fn read<R>(&self, f: impl FnOnce(&ViewState) -> R) -> R {
        let state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        f(&state)
    }

    pub fn render(&self, slot: Slot, value: impl Into<String>) {
        let value = value.into();
        self.update(|state| {
            state.slots.insert(slot, value);
        });
    }

    /// Writes several slots under one lock so no reader observes a partial update.
    pub fn render_all(&self, values: impl IntoIterator<Item = (Slot, String)>) {
        self.update(|state| state.slots.extend(values));
    }

    pub fn get(&self, slot: Slot) -> Option<String> {
        self.read(|state| state.slot(slot).map(str::to_owned))
    }

    pub fn set_owner_operations_visible(&self, visible: bool) {
        self.update(|state| state.owner_operations_visible = visible);
    }

    pub fn owner_operations_visible(&self) -> bool {
        self.read(ViewState::owner_operations_visible)
    }

    pub fn bid_input(&self) -> String {
        self.read(|state| state.bid_input.clone())
    }

    pub fn set_bid_input(&self, input: impl Into<String>) {
        let input = input.into();
        self.update(|state| state.bid_input = input);
    }

    pub fn alert(&self, alert: Alert) {
        self.update(|state| {
            state.alerts.push_back(alert);
            while state.alerts.len() > MAX_PENDING_ALERTS {
                state.alerts.pop_front();
            }
        });
    }

    pub fn dismiss_alert(&self) -> Option<Alert> {
        self.update(|state| state.alerts.pop_front())
    }

    pub fn state(&self) -> ViewState {
        self.read(ViewState::clone)
    }

    /// Resolves after the next mutation (or immediately if one happened since
    /// the last call).
    pub async fn changed(&self) {
        self.changed.notified().await;
    }
}

#[cfg(test)]
mod tests {
    #![allow(non_snake_case)]
    use super::*;

    #[test]
    fn render__overwrites_only_the_named_slot() {
        // given
        let view = View::new();
        view.render(Slot::HighestBid, "1.5");
        view.render(Slot::State, "0");

        // when
        view.render(Slot::State, "1");

        // then
        assert_eq!(view.get(Slot::State).as_deref(), Some("1"));
        assert_eq!(view.get(Slot::HighestBid).as_deref(), Some("1.5"));
        assert_eq!(view.get(Slot::MyBid), None);
    }

    #[test]
    fn render_all__writes_every_value() {
        let view = View::new();

        view.render_all([
            (Slot::CarBrand, "Hyundai".to_string()),
            (Slot::RegistrationNumber, "12가3456".to_string()),
        ]);

        let state = view.state();
        assert_eq!(state.slot(Slot::CarBrand), Some("Hyundai"));
        assert_eq!(state.slot(Slot::RegistrationNumber), Some("12가3456"));
    }

    #[test]
    fn owner_operations__are_hidden_until_revealed() {
        let view = View::new();
        assert!(!view.owner_operations_visible());

        view.set_owner_operations_visible(true);

        assert!(view.owner_operations_visible());
    }

    #[test]
    fn alerts__are_dismissed_in_arrival_order() {
        let view = View::new();
        view.alert(Alert::new("first"));
        view.alert(Alert::new("second"));

        assert_eq!(view.state().current_alert(), Some(&Alert::new("first")));
        assert_eq!(view.dismiss_alert(), Some(Alert::new("first")));
        assert_eq!(view.dismiss_alert(), Some(Alert::new("second")));
        assert_eq!(view.dismiss_alert(), None);
    }

    #[tokio::test]
    async fn changed__resolves_after_a_write() {
        let view = View::new();
        let writer = view.clone();

        writer.render(Slot::EventsLog, "hello");

        tokio::time::timeout(std::time::Duration::from_secs(1), view.changed())
            .await
            .expect("view change was not signalled");
    }
}
