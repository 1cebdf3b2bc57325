//! Snapshot diffing.
//!
//! Compares the previously known open orders against a fresh open-orders
//! snapshot. Identity is the order id; every other field is taken from the
//! newest snapshot.

use std::collections::HashSet;

use super::classifier::is_part_filled;
use super::types::{Order, OrderGroups, OrderId};

/// Group `incoming` against `previous`.
///
/// Fills `new_orders`, `matched_orders`, `missing_orders` and
/// `part_filled_orders`. Cancelled/settled are left empty for the resolver.
///
/// Part fills are only computed over new orders, so a known order that picks
/// up a partial fill between cycles is not reported.
pub fn group_orders(previous: &[Order], incoming: &[Order]) -> OrderGroups {
    let previous_ids: HashSet<&OrderId> = previous.iter().map(|o| &o.id).collect();
    let incoming_ids: HashSet<&OrderId> = incoming.iter().map(|o| &o.id).collect();

    let (matched_orders, new_orders): (Vec<Order>, Vec<Order>) = incoming
        .iter()
        .cloned()
        .partition(|o| previous_ids.contains(&o.id));

    let missing_orders: Vec<Order> = previous
        .iter()
        .filter(|o| !incoming_ids.contains(&o.id))
        .cloned()
        .collect();

    let part_filled_orders = new_orders
        .iter()
        .filter(|o| is_part_filled(o))
        .cloned()
        .collect();

    OrderGroups {
        new_orders,
        matched_orders,
        missing_orders,
        part_filled_orders,
        ..Default::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn order(id: &str) -> Order {
        Order {
            id: OrderId::new(id),
            product_id: "BTC-USD".to_string(),
            ..Default::default()
        }
    }

    fn ids(orders: &[Order]) -> Vec<&str> {
        orders.iter().map(|o| o.id.as_str()).collect()
    }

    #[test]
    fn test_first_snapshot_is_all_new() {
        let groups = group_orders(&[], &[order("a"), order("b")]);
        assert_eq!(ids(&groups.new_orders), vec!["a", "b"]);
        assert!(groups.matched_orders.is_empty());
        assert!(groups.missing_orders.is_empty());
    }

    #[test]
    fn test_new_matched_missing() {
        let previous = vec![order("a"), order("b"), order("c")];
        let incoming = vec![order("b"), order("d")];

        let groups = group_orders(&previous, &incoming);
        assert_eq!(ids(&groups.new_orders), vec!["d"]);
        assert_eq!(ids(&groups.matched_orders), vec!["b"]);
        assert_eq!(ids(&groups.missing_orders), vec!["a", "c"]);
        assert!(groups.cancelled_orders.is_empty());
        assert!(groups.settled_orders.is_empty());
    }

    #[test]
    fn test_matched_orders_carry_incoming_fields() {
        let previous = vec![order("a")];
        let mut updated = order("a");
        updated.filled_size = dec!(0.25);

        let groups = group_orders(&previous, &[updated.clone()]);
        assert_eq!(groups.matched_orders, vec![updated]);
        // Known order picking up a fill is not a fresh part fill.
        assert!(groups.part_filled_orders.is_empty());
    }

    #[test]
    fn test_part_fill_on_new_order() {
        let mut filled = order("n");
        filled.filled_size = dec!(0.1);

        let groups = group_orders(&[order("a")], &[order("a"), filled]);
        assert_eq!(ids(&groups.new_orders), vec!["n"]);
        assert_eq!(ids(&groups.part_filled_orders), vec!["n"]);
        assert!(groups.has_changes());
    }

    #[test]
    fn test_same_snapshot_twice_is_idle() {
        let snapshot = vec![order("a"), order("b")];
        let groups = group_orders(&snapshot, &snapshot);
        assert!(groups.new_orders.is_empty());
        assert!(groups.missing_orders.is_empty());
        assert_eq!(groups.matched_orders, snapshot);
        assert!(!groups.has_changes());
    }
}
