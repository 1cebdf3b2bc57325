//! CLI command handlers.
//!
//! This module contains the implementation for each CLI subcommand,
//! delegating to the order watcher and flip engine.

mod flip;
mod markets;
mod watch;

pub use flip::run_flip;
pub use markets::run_markets;
pub use watch::{handle_event, run_watch};

use std::sync::Arc;

use tracing::info;

use crate::cli::WatchConfig;
use crate::exchange::{CoinbaseClient, DryRunClient, ExchangeConfig, ExchangeError, OrderClient};

/// Authenticated exchange client, wrapped for dry runs when requested.
pub fn build_client(config: &WatchConfig) -> Result<Arc<dyn OrderClient>, ExchangeError> {
    let exchange_config = ExchangeConfig::from_env(config.sandbox)?;
    let client = CoinbaseClient::new(exchange_config)?;

    if config.dry_run {
        info!("Dry run: order placements will be logged, not submitted");
        Ok(Arc::new(DryRunClient::new(client)))
    } else {
        Ok(Arc::new(client))
    }
}
