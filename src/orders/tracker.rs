//! Known-orders state.
//!
//! Holds the last open-orders snapshot the watcher saw. The snapshot is only
//! ever replaced wholesale, once per cycle, right after the diff against it.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use tracing::debug;

use super::types::Order;

#[derive(Debug, Default)]
struct Snapshot {
    orders: Vec<Order>,
    updated_at: Option<DateTime<Utc>>,
}

/// Thread-safe holder for the previous snapshot.
///
/// Cloning shares the underlying state, so a handle can be given to the HTTP
/// health endpoint while the watcher keeps writing.
#[derive(Debug, Clone, Default)]
pub struct KnownOrders {
    inner: Arc<RwLock<Snapshot>>,
}

impl KnownOrders {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the snapshot, returning the one it replaced.
    pub async fn replace(&self, orders: Vec<Order>) -> Vec<Order> {
        let mut snapshot = self.inner.write().await;
        debug!(
            previous = snapshot.orders.len(),
            current = orders.len(),
            "Known orders replaced"
        );
        snapshot.updated_at = Some(Utc::now());
        std::mem::replace(&mut snapshot.orders, orders)
    }

    pub async fn len(&self) -> usize {
        self.inner.read().await.orders.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.inner.read().await.orders.is_empty()
    }

    /// When the snapshot was last replaced; `None` before the first cycle.
    pub async fn updated_at(&self) -> Option<DateTime<Utc>> {
        self.inner.read().await.updated_at
    }
}
