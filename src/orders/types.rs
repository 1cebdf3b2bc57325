//! Core order types.
//!
//! `Order` mirrors the exchange's order record. Every field except `id` may
//! change between snapshots, so orders are compared by id only.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::types::OrderSide;

/// Type-safe order identifier (exchange-assigned).
///
/// # Example
///
/// ```
/// use orderwatch::orders::OrderId;
///
/// let id = OrderId::new("abc-123-def");
/// assert_eq!(id.as_str(), "abc-123-def");
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrderId(String);

impl OrderId {
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl std::fmt::Display for OrderId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for OrderId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for OrderId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl AsRef<str> for OrderId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Order status as reported by the exchange.
///
/// `Cancelled` is never sent by the exchange: a cancelled order is deleted
/// and its by-id lookup 404s, so the resolver assigns this status itself.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    Open,
    Pending,
    Active,
    Done,
    Rejected,
    #[serde(rename = "isCancelled")]
    Cancelled,
    #[default]
    #[serde(other)]
    Unknown,
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Open => write!(f, "open"),
            Self::Pending => write!(f, "pending"),
            Self::Active => write!(f, "active"),
            Self::Done => write!(f, "done"),
            Self::Rejected => write!(f, "rejected"),
            Self::Cancelled => write!(f, "isCancelled"),
            Self::Unknown => write!(f, "unknown"),
        }
    }
}

/// A single order snapshot.
///
/// Absent fields deserialize to their falsy value (zero sizes, no side,
/// unknown status, not settled).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    /// Market the order trades on (e.g. "BTC-USD")
    #[serde(default)]
    pub product_id: String,
    #[serde(default)]
    pub side: Option<OrderSide>,
    #[serde(default)]
    pub price: Decimal,
    #[serde(default)]
    pub size: Decimal,
    #[serde(default)]
    pub filled_size: Decimal,
    #[serde(default)]
    pub status: OrderStatus,
    #[serde(default)]
    pub settled: bool,
}

impl Order {
    /// Synthesized record for an order whose lookup reported not-found.
    #[must_use]
    pub fn cancelled(id: OrderId) -> Self {
        Self {
            id,
            status: OrderStatus::Cancelled,
            ..Default::default()
        }
    }
}

/// Per-cycle classification of a snapshot against the previous one.
///
/// `new_orders` and `matched_orders` partition the incoming snapshot;
/// `missing_orders` are previously known orders absent from it.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct OrderGroups {
    pub new_orders: Vec<Order>,
    pub matched_orders: Vec<Order>,
    pub missing_orders: Vec<Order>,
    pub cancelled_orders: Vec<Order>,
    pub settled_orders: Vec<Order>,
    pub part_filled_orders: Vec<Order>,
}

impl OrderGroups {
    /// True if anything other than `matched_orders` is non-empty.
    pub fn has_changes(&self) -> bool {
        !(self.new_orders.is_empty()
            && self.missing_orders.is_empty()
            && self.cancelled_orders.is_empty()
            && self.settled_orders.is_empty()
            && self.part_filled_orders.is_empty())
    }
}
