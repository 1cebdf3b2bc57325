//! Order Reconciliation Module
//!
//! Tracks the exchange's open orders across polling cycles and classifies
//! what changed between two snapshots.
//!
//! # Architecture
//!
//! - `classifier` - single-order predicates (settled, cancelled, part filled)
//! - `diff` - new / matched / missing partition of two snapshots
//! - `resolver` - by-id lookups that tell cancelled from settled
//! - `KnownOrders` - the previous snapshot
//! - `OrderWatcher` - the polling loop tying it together
//!
//! # Example
//!
//! ```ignore
//! use orderwatch::orders::{OrderWatcher, WatcherConfig};
//!
//! let watcher = Arc::new(OrderWatcher::new(client, WatcherConfig::default(), rules));
//! let mut events = watcher.subscribe();
//! let handle = watcher.clone().start();
//! ```

pub mod classifier;
pub mod diff;
mod reconciler;
pub mod resolver;
mod tracker;
mod types;

pub use diff::group_orders;
pub use reconciler::{CycleOutcome, CyclePhase, OrderWatcher, WatchError, WatcherConfig};
pub use resolver::resolve_missing;
pub use tracker::KnownOrders;
pub use types::{Order, OrderGroups, OrderId, OrderStatus};
