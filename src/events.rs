//! Order events and the broadcast bus that carries them.
//!
//! Publishing never waits on subscribers. A subscriber that falls more than
//! the channel capacity behind sees `RecvError::Lagged` and skips ahead.

use serde::Serialize;
use tokio::sync::broadcast;
use tracing::debug;

use crate::metrics;
use crate::orders::{Order, OrderGroups};

pub const DEFAULT_EVENT_CAPACITY: usize = 64;

/// Events raised by a reconciliation cycle.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum OrderEvent {
    /// One or more missing orders were confirmed settled
    Settled(Vec<Order>),
    /// Anything other than matched orders happened this cycle
    Changed(OrderGroups),
}

impl OrderEvent {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Settled(_) => "settled",
            Self::Changed(_) => "changed",
        }
    }
}

/// Decide which events a finished cycle raises, settlement first.
pub fn events_for(groups: &OrderGroups) -> Vec<OrderEvent> {
    let mut events = Vec::with_capacity(2);
    if !groups.settled_orders.is_empty() {
        events.push(OrderEvent::Settled(groups.settled_orders.clone()));
    }
    if groups.has_changes() {
        events.push(OrderEvent::Changed(groups.clone()));
    }
    events
}

#[derive(Debug, Clone)]
pub struct EventBus {
    sender: broadcast::Sender<OrderEvent>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _rx) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<OrderEvent> {
        self.sender.subscribe()
    }

    /// Publish to current subscribers; returns how many received it.
    pub fn publish(&self, event: OrderEvent) -> usize {
        let kind = event.kind();
        metrics::record_event(kind);
        match self.sender.send(event) {
            Ok(receivers) => receivers,
            Err(_) => {
                debug!(kind, "No subscribers for order event");
                0
            }
        }
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_EVENT_CAPACITY)
    }
}
