//! Human-readable cycle summaries.

use crate::orders::{Order, OrderGroups};

/// Lines describing a cycle's changes: a header, then one line per non-empty
/// group among New / Cancelled / Settled / Part Fills.
pub fn render_changes(groups: &OrderGroups) -> Vec<String> {
    let counts = [
        ("New:", groups.new_orders.len()),
        ("Cancelled:", groups.cancelled_orders.len()),
        ("Settled:", groups.settled_orders.len()),
        ("Part Fills:", groups.part_filled_orders.len()),
    ];

    std::iter::once("Order changes:".to_string())
        .chain(
            counts
                .into_iter()
                .filter(|(_, count)| *count > 0)
                .map(|(label, count)| format!("  {:<12}{}", label, count)),
        )
        .collect()
}

/// Settlement notification: title and the markets involved, in first-seen order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SettledNotice {
    pub title: String,
    pub message: String,
}

pub fn render_settled(orders: &[Order]) -> SettledNotice {
    let mut markets: Vec<&str> = Vec::new();
    for order in orders {
        if !markets.contains(&order.product_id.as_str()) {
            markets.push(&order.product_id);
        }
    }

    let noun = if orders.len() > 1 { "orders" } else { "order" };
    SettledNotice {
        title: format!("{} {} filled!", orders.len(), noun),
        message: format!("In: {}", markets.join(", ")),
    }
}
