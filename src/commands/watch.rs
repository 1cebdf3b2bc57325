//! Watch command handler.
//!
//! Runs the order watcher until Ctrl-C, with a subscriber task that records
//! every event and optionally flips settled orders.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast::{self, error::RecvError};
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use super::build_client;
use crate::cli::WatchConfig;
use crate::events::OrderEvent;
use crate::exchange::OrderClient;
use crate::health::{create_health_state, run_health_server, spawn_health_updater};
use crate::logging::{EventRecorder, MultiRecorder, SummaryRecorder, TracingRecorder};
use crate::orders::{Order, OrderWatcher};

const HEALTH_REFRESH: Duration = Duration::from_secs(5);

/// Run the reconciliation loop against the configured exchange.
///
/// # Errors
/// Returns error if configuration is invalid or the client cannot be built.
pub async fn run_watch(config: WatchConfig) -> Result<(), Box<dyn std::error::Error>> {
    config.validate()?;
    let rules = config.market_rules()?;
    let client = build_client(&config)?;
    let watcher = Arc::new(OrderWatcher::new(client, config.watcher_config(), rules));

    // Subscribe before the first tick so the initial snapshot is reported.
    let recorder = MultiRecorder::new(vec![
        Box::new(SummaryRecorder::new()),
        Box::new(TracingRecorder::new()),
    ]);
    let subscriber = spawn_event_handler(
        watcher.clone(),
        watcher.subscribe(),
        recorder,
        config.auto_flip,
    );

    if let Some(port) = config.metrics_port {
        let state = create_health_state();
        spawn_health_updater(state.clone(), watcher.clone(), HEALTH_REFRESH);
        tokio::spawn(run_health_server(port, state));
    }

    info!(
        product_id = config.product_id.as_deref().unwrap_or("all"),
        interval_ms = config.polling_interval.as_millis() as u64,
        auto_flip = config.auto_flip,
        dry_run = config.dry_run,
        "Watching open orders"
    );
    let poller = watcher.clone().start();

    tokio::signal::ctrl_c().await?;
    info!("Shutdown signal received, stopping watcher");
    poller.abort();
    subscriber.abort();

    Ok(())
}

fn spawn_event_handler<C: OrderClient + 'static, R: EventRecorder + 'static>(
    watcher: Arc<OrderWatcher<C>>,
    mut events: broadcast::Receiver<OrderEvent>,
    recorder: R,
    auto_flip: bool,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(event) => {
                    handle_event(&watcher, &recorder, &event, auto_flip).await;
                }
                Err(RecvError::Lagged(skipped)) => {
                    warn!(skipped, "Event subscriber lagged, events dropped");
                }
                Err(RecvError::Closed) => break,
            }
        }
    })
}

/// Record one event and, for settlements with `auto_flip`, flip the first
/// settled order. Returns the placed counter-order, if any.
pub async fn handle_event<C: OrderClient, R: EventRecorder + ?Sized>(
    watcher: &OrderWatcher<C>,
    recorder: &R,
    event: &OrderEvent,
    auto_flip: bool,
) -> Option<Order> {
    if let Err(e) = recorder.record(event).await {
        error!(error = %e, "Failed to record order event");
    }

    let OrderEvent::Settled(orders) = event else {
        return None;
    };
    if !auto_flip {
        return None;
    }
    // Usually only one order settles per cycle; the rest are left to the operator.
    let first = orders.first()?;
    if orders.len() > 1 {
        warn!(
            settled = orders.len(),
            order_id = %first.id,
            "Several orders settled, flipping only the first"
        );
    }

    match watcher.flip_order(first).await {
        Ok(placed) => placed,
        Err(e) => {
            error!(order_id = %first.id, error = %e, "Flip failed");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exchange::PaperExchange;
    use crate::markets::MarketRules;
    use crate::orders::{OrderGroups, OrderId, OrderStatus, WatcherConfig};
    use crate::types::OrderSide;
    use rust_decimal_macros::dec;

    fn watcher() -> OrderWatcher<PaperExchange> {
        OrderWatcher::new(
            PaperExchange::new(),
            WatcherConfig::default(),
            Arc::new(MarketRules::coinbase()),
        )
    }

    fn settled(id: &str) -> Order {
        Order {
            id: OrderId::new(id),
            product_id: "BTC-USD".to_string(),
            side: Some(OrderSide::Buy),
            price: dec!(30000.00),
            size: dec!(0.01),
            filled_size: dec!(0.01),
            status: OrderStatus::Done,
            settled: true,
        }
    }

    #[tokio::test]
    async fn test_auto_flip_places_first_only() {
        let watcher = watcher();
        let event = OrderEvent::Settled(vec![settled("a"), settled("b")]);

        let placed = handle_event(&watcher, &SummaryRecorder::new(), &event, true)
            .await
            .unwrap();
        assert_eq!(placed.side, Some(OrderSide::Sell));
        assert_eq!(placed.price, dec!(29400.00));
        assert_eq!(watcher.client().all_orders().await.len(), 1);
    }

    #[tokio::test]
    async fn test_no_flip_without_auto_flip_or_settlement() {
        let watcher = watcher();

        let event = OrderEvent::Settled(vec![settled("a")]);
        assert!(handle_event(&watcher, &SummaryRecorder::new(), &event, false)
            .await
            .is_none());

        let event = OrderEvent::Changed(OrderGroups::default());
        assert!(handle_event(&watcher, &SummaryRecorder::new(), &event, true)
            .await
            .is_none());

        assert!(watcher.client().all_orders().await.is_empty());
    }

    #[tokio::test]
    async fn test_rejected_flip_is_logged_not_raised() {
        let watcher = watcher();
        watcher.client().reject_placements(true).await;

        let event = OrderEvent::Settled(vec![settled("a")]);
        assert!(handle_event(&watcher, &TracingRecorder::new(), &event, true)
            .await
            .is_none());
    }
}
