//! CLI argument parsing using clap.
//!
//! This module defines the command-line interface for orderwatch,
//! including all subcommands and their arguments.

mod config;

pub use config::{load_market_rules, ConfigError, WatchConfig};

use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};
use rust_decimal::Decimal;

/// orderwatch - Open-order reconciliation and settlement flipping
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// The subcommand to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Set the verbosity level (error, warn, info, debug, trace)
    #[arg(long, global = true, default_value = "info")]
    pub verbose: String,
}

/// Arguments shared by commands that talk to the exchange
#[derive(Args, Debug, Clone)]
pub struct ExchangeArgs {
    /// Use the exchange sandbox
    #[arg(long, default_value_t = false)]
    pub sandbox: bool,
    /// Log order placements instead of submitting them
    #[arg(long, default_value_t = false)]
    pub dry_run: bool,
    /// JSON file with market rules overriding the built-in table
    #[arg(long)]
    pub markets_file: Option<PathBuf>,
    /// Multiplier applied to the settlement price of a flip
    #[arg(long, default_value = "0.98")]
    pub drop_multiplier: Decimal,
    /// Accepted for compatibility; not used in flip pricing
    #[arg(long, default_value = "1.01")]
    pub rise_multiplier: Decimal,
}

/// Available CLI commands
#[derive(Subcommand)]
pub enum Commands {
    /// Poll open orders and report new, cancelled, settled and part-filled orders
    Watch {
        /// Only watch this market (e.g., "BTC-USD")
        #[arg(short, long)]
        product_id: Option<String>,
        /// Milliseconds between polls
        #[arg(long, default_value_t = 10_000)]
        interval_ms: u64,
        /// Skip individual lookups when this many orders go missing at once
        #[arg(long, default_value_t = 10)]
        max_missing_fetch: usize,
        /// Buffered events per subscriber
        #[arg(long, default_value_t = 64)]
        event_capacity: usize,
        /// Place a counter-order for the first order of each settlement
        #[arg(long, default_value_t = false)]
        auto_flip: bool,
        /// Serve /health and /metrics on this port
        #[arg(long)]
        metrics_port: Option<u16>,
        #[command(flatten)]
        exchange: ExchangeArgs,
    },

    /// Place the counter-order for one settled order
    Flip {
        /// Exchange id of the settled order
        order_id: String,
        #[command(flatten)]
        exchange: ExchangeArgs,
    },

    /// Print the effective market rules table
    Markets {
        /// JSON file with market rules overriding the built-in table
        #[arg(long)]
        markets_file: Option<PathBuf>,
        /// Print as JSON
        #[arg(long, default_value_t = false)]
        json: bool,
    },
}

impl ExchangeArgs {
    /// Base configuration carrying only the exchange-level settings
    pub fn to_config(&self) -> WatchConfig {
        WatchConfig {
            rise_multiplier: self.rise_multiplier,
            drop_multiplier: self.drop_multiplier,
            dry_run: self.dry_run,
            sandbox: self.sandbox,
            markets_file: self.markets_file.clone(),
            ..WatchConfig::default()
        }
    }
}

/// Build the watch configuration from parsed arguments.
pub fn watch_config(
    product_id: Option<String>,
    interval_ms: u64,
    max_missing_fetch: usize,
    event_capacity: usize,
    auto_flip: bool,
    metrics_port: Option<u16>,
    exchange: &ExchangeArgs,
) -> WatchConfig {
    WatchConfig {
        product_id,
        polling_interval: Duration::from_millis(interval_ms),
        max_missing_fetch,
        event_capacity,
        auto_flip,
        metrics_port,
        ..exchange.to_config()
    }
}
