//! Missing-order resolution.
//!
//! The open-orders listing never reports closed orders, so every order that
//! drops out of it is either cancelled or settled. Each one is looked up by id
//! to tell which; a 404 means the exchange purged a cancelled order.

use futures_util::future::try_join_all;
use tracing::{debug, info, warn};

use super::classifier::{is_cancelled, is_settled};
use super::types::{Order, OrderGroups, OrderId};
use crate::exchange::{ExchangeError, OrderClient};
use crate::metrics;

/// Default cap on individual lookups per cycle.
pub const DEFAULT_MAX_MISSING_FETCH: usize = 10;

/// Look one missing order up, mapping not-found to the cancellation sentinel.
pub async fn fetch_missing_order<C: OrderClient + ?Sized>(
    client: &C,
    id: &OrderId,
) -> Result<Order, ExchangeError> {
    metrics::record_missing_fetch();
    match client.get_order(id).await {
        Ok(order) => Ok(order),
        Err(e) if e.is_not_found() => {
            debug!(order_id = %id, "Missing order not found, treating as cancelled");
            Ok(Order::cancelled(id.clone()))
        }
        Err(e) => Err(e),
    }
}

/// Fill `cancelled_orders` / `settled_orders` for the missing orders in `groups`.
///
/// Batches of `max_fetch` or more are not resolved at all, to bound API
/// usage; those orders are dropped from the groups without a disposition, so
/// the batch alone does not count as a change. Lookups in a batch
/// run concurrently and any non-404 failure fails the whole batch.
pub async fn resolve_missing<C: OrderClient + ?Sized>(
    client: &C,
    mut groups: OrderGroups,
    max_fetch: usize,
) -> Result<OrderGroups, ExchangeError> {
    if groups.missing_orders.is_empty() {
        return Ok(groups);
    }

    let ids: Vec<&OrderId> = groups.missing_orders.iter().map(|o| &o.id).collect();

    if ids.len() >= max_fetch {
        warn!(
            count = ids.len(),
            cap = max_fetch,
            ids = ?ids.iter().map(|id| id.as_str()).collect::<Vec<_>>(),
            "Skipping individual fetch of missing orders"
        );
        metrics::record_skipped_resolution();
        groups.missing_orders.clear();
        return Ok(groups);
    }

    info!(count = ids.len(), "Fetching missing orders individually");

    let resolved = try_join_all(ids.into_iter().map(|id| fetch_missing_order(client, id))).await?;

    // Orders that are neither (e.g. still settling) stay only in `missing_orders`.
    groups.cancelled_orders = resolved.iter().filter(|o| is_cancelled(o)).cloned().collect();
    groups.settled_orders = resolved.into_iter().filter(is_settled).collect();

    Ok(groups)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exchange::{LimitOrderParams, OrderQuery};
    use crate::orders::OrderStatus;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::sync::Notify;

    /// Mock client answering lookups from a fixed table
    struct MockClient {
        answers: HashMap<String, Result<Order, ExchangeError>>,
        lookups: AtomicUsize,
    }

    impl MockClient {
        fn new(answers: Vec<(&str, Result<Order, ExchangeError>)>) -> Self {
            Self {
                answers: answers
                    .into_iter()
                    .map(|(id, answer)| (id.to_string(), answer))
                    .collect(),
                lookups: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl OrderClient for MockClient {
        async fn list_open_orders(&self, _query: &OrderQuery) -> Result<Vec<Order>, ExchangeError> {
            Ok(Vec::new())
        }

        async fn get_order(&self, id: &OrderId) -> Result<Order, ExchangeError> {
            self.lookups.fetch_add(1, Ordering::SeqCst);
            self.answers
                .get(id.as_str())
                .cloned()
                .unwrap_or_else(|| Err(ExchangeError::NotFound(id.to_string())))
        }

        async fn place_buy(&self, _params: &LimitOrderParams) -> Result<Order, ExchangeError> {
            Err(ExchangeError::Other("unused".to_string()))
        }

        async fn place_sell(&self, _params: &LimitOrderParams) -> Result<Order, ExchangeError> {
            Err(ExchangeError::Other("unused".to_string()))
        }
    }

    fn order(id: &str) -> Order {
        Order {
            id: OrderId::new(id),
            status: OrderStatus::Open,
            ..Default::default()
        }
    }

    fn missing(ids: &[&str]) -> OrderGroups {
        OrderGroups {
            missing_orders: ids.iter().map(|id| order(id)).collect(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_empty_batch_passes_through() {
        let client = MockClient::new(vec![]);
        let groups = resolve_missing(&client, OrderGroups::default(), 10)
            .await
            .unwrap();
        assert_eq!(groups, OrderGroups::default());
        assert_eq!(client.lookups.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_partitions_cancelled_and_settled() {
        let settled = Order {
            settled: true,
            status: OrderStatus::Done,
            ..order("filled")
        };
        let client = MockClient::new(vec![
            ("filled", Ok(settled.clone())),
            ("settling", Ok(order("settling"))),
        ]);

        let groups = resolve_missing(&client, missing(&["filled", "purged", "settling"]), 10)
            .await
            .unwrap();

        assert_eq!(groups.settled_orders, vec![settled]);
        assert_eq!(groups.cancelled_orders, vec![Order::cancelled(OrderId::new("purged"))]);
        assert_eq!(groups.missing_orders.len(), 3);
        assert_eq!(client.lookups.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_cap_boundary() {
        let nine: Vec<String> = (0..9).map(|i| format!("o{}", i)).collect();
        let ten: Vec<String> = (0..10).map(|i| format!("o{}", i)).collect();

        let client = MockClient::new(vec![]);
        let groups = resolve_missing(
            &client,
            missing(&nine.iter().map(String::as_str).collect::<Vec<_>>()),
            DEFAULT_MAX_MISSING_FETCH,
        )
        .await
        .unwrap();
        assert_eq!(client.lookups.load(Ordering::SeqCst), 9);
        assert_eq!(groups.cancelled_orders.len(), 9);

        let client = MockClient::new(vec![]);
        let groups = resolve_missing(
            &client,
            missing(&ten.iter().map(String::as_str).collect::<Vec<_>>()),
            DEFAULT_MAX_MISSING_FETCH,
        )
        .await
        .unwrap();
        assert_eq!(client.lookups.load(Ordering::SeqCst), 0);
        assert!(groups.cancelled_orders.is_empty());
        assert!(groups.settled_orders.is_empty());
        assert!(groups.missing_orders.is_empty());
        assert!(!groups.has_changes());
    }

    /// Mock client whose lookups all block until every lookup has started
    struct GatedClient {
        expected: usize,
        started: AtomicUsize,
        finished: AtomicUsize,
        all_started: Notify,
    }

    #[async_trait]
    impl OrderClient for GatedClient {
        async fn list_open_orders(&self, _query: &OrderQuery) -> Result<Vec<Order>, ExchangeError> {
            Ok(Vec::new())
        }

        async fn get_order(&self, id: &OrderId) -> Result<Order, ExchangeError> {
            let notified = self.all_started.notified();
            if self.started.fetch_add(1, Ordering::SeqCst) + 1 == self.expected {
                self.all_started.notify_waiters();
            } else {
                notified.await;
            }
            // No lookup may finish before the last one has started.
            assert_eq!(self.started.load(Ordering::SeqCst), self.expected);
            self.finished.fetch_add(1, Ordering::SeqCst);
            Err(ExchangeError::NotFound(id.to_string()))
        }

        async fn place_buy(&self, _params: &LimitOrderParams) -> Result<Order, ExchangeError> {
            Err(ExchangeError::Other("unused".to_string()))
        }

        async fn place_sell(&self, _params: &LimitOrderParams) -> Result<Order, ExchangeError> {
            Err(ExchangeError::Other("unused".to_string()))
        }
    }

    #[tokio::test]
    async fn test_lookups_in_a_batch_run_concurrently() {
        let client = GatedClient {
            expected: 5,
            started: AtomicUsize::new(0),
            finished: AtomicUsize::new(0),
            all_started: Notify::new(),
        };

        // Sequential lookups would park the first one forever.
        let groups = tokio::time::timeout(
            std::time::Duration::from_secs(5),
            resolve_missing(&client, missing(&["a", "b", "c", "d", "e"]), 10),
        )
        .await
        .expect("lookups did not run concurrently")
        .unwrap();

        assert_eq!(client.finished.load(Ordering::SeqCst), 5);
        assert_eq!(groups.cancelled_orders.len(), 5);
    }

    #[tokio::test]
    async fn test_transport_error_fails_batch() {
        let client = MockClient::new(vec![
            ("ok", Ok(order("ok"))),
            (
                "broken",
                Err(ExchangeError::Network("connection reset".to_string())),
            ),
        ]);

        let result = resolve_missing(&client, missing(&["ok", "broken"]), 10).await;
        assert_eq!(
            result.unwrap_err(),
            ExchangeError::Network("connection reset".to_string())
        );
    }
}
