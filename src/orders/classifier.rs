//! Single-snapshot order predicates.

use rust_decimal::Decimal;

use super::types::{Order, OrderStatus};
use crate::types::OrderSide;

/// Cancelled means the resolver tagged it with the not-found sentinel.
pub fn is_cancelled(order: &Order) -> bool {
    order.status == OrderStatus::Cancelled
}

pub fn is_settled(order: &Order) -> bool {
    order.settled
}

pub fn is_part_filled(order: &Order) -> bool {
    order.filled_size > Decimal::ZERO
}

pub fn is_buy(order: &Order) -> bool {
    order.side == Some(OrderSide::Buy)
}

pub fn is_sell(order: &Order) -> bool {
    order.side == Some(OrderSide::Sell)
}
