//! Flip command handler.
//!
//! Looks one order up by id and places its counter-order.

use tracing::{info, warn};

use super::build_client;
use crate::cli::WatchConfig;
use crate::orders::classifier::is_settled;
use crate::orders::OrderId;
use crate::strategy::FlipEngine;

/// Flip a single order by exchange id.
///
/// # Errors
/// Returns error if the order cannot be fetched or the placement fails or is
/// rejected.
pub async fn run_flip(
    order_id: String,
    config: WatchConfig,
) -> Result<(), Box<dyn std::error::Error>> {
    config.validate()?;
    let rules = config.market_rules()?;
    let client = build_client(&config)?;

    let order = client.get_order(&OrderId::new(order_id)).await?;
    if !is_settled(&order) {
        warn!(
            order_id = %order.id,
            status = %order.status,
            filled = %order.filled_size,
            "Order is not settled, flipping its filled size"
        );
    }

    let engine = FlipEngine::new(config.flip_config(), rules);
    match engine.flip(&client, &order).await? {
        Some(placed) => info!(
            order_id = %placed.id,
            status = %placed.status,
            "Counter-order submitted"
        ),
        None => warn!(order_id = %order.id, "Order not eligible for a flip"),
    }

    Ok(())
}
