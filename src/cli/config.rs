//! CLI configuration structs bridging CLI arguments to domain types.
//!
//! These structs decouple the CLI parsing layer from the engine, so command
//! handlers work with validated, typed configurations.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use rust_decimal::Decimal;
use thiserror::Error;

use crate::events::DEFAULT_EVENT_CAPACITY;
use crate::markets::{MarketRules, MarketRulesError};
use crate::orders::resolver::DEFAULT_MAX_MISSING_FETCH;
use crate::orders::WatcherConfig;
use crate::strategy::flip::{DEFAULT_DROP_MULTIPLIER, DEFAULT_RISE_MULTIPLIER};
use crate::strategy::FlipConfig;

/// Errors that can occur when validating CLI configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{name} must be positive, got {value}")]
    InvalidMultiplier { name: &'static str, value: Decimal },

    #[error("Polling interval must be greater than zero")]
    ZeroInterval,

    #[error("Missing-order fetch cap must be greater than zero")]
    ZeroFetchCap,

    #[error("Failed to load market rules from {path}: {source}")]
    MarketRules {
        path: PathBuf,
        #[source]
        source: MarketRulesError,
    },
}

/// Configuration for the `watch` and `flip` commands.
#[derive(Debug, Clone)]
pub struct WatchConfig {
    /// Only watch this market (e.g., "BTC-USD")
    pub product_id: Option<String>,
    pub polling_interval: Duration,
    /// Accepted for configuration compatibility; flips price off `drop_multiplier`
    pub rise_multiplier: Decimal,
    pub drop_multiplier: Decimal,
    pub max_missing_fetch: usize,
    pub event_capacity: usize,
    /// Flip the first settled order of every settlement event
    pub auto_flip: bool,
    /// Log placements instead of submitting them
    pub dry_run: bool,
    pub sandbox: bool,
    /// JSON rules overlaid on the built-in table
    pub markets_file: Option<PathBuf>,
    pub metrics_port: Option<u16>,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            product_id: None,
            polling_interval: Duration::from_millis(10_000),
            rise_multiplier: DEFAULT_RISE_MULTIPLIER,
            drop_multiplier: DEFAULT_DROP_MULTIPLIER,
            max_missing_fetch: DEFAULT_MAX_MISSING_FETCH,
            event_capacity: DEFAULT_EVENT_CAPACITY,
            auto_flip: false,
            dry_run: false,
            sandbox: false,
            markets_file: None,
            metrics_port: None,
        }
    }
}

impl WatchConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (name, value) in [
            ("rise_multiplier", self.rise_multiplier),
            ("drop_multiplier", self.drop_multiplier),
        ] {
            if value <= Decimal::ZERO {
                return Err(ConfigError::InvalidMultiplier { name, value });
            }
        }
        if self.polling_interval.is_zero() {
            return Err(ConfigError::ZeroInterval);
        }
        if self.max_missing_fetch == 0 {
            return Err(ConfigError::ZeroFetchCap);
        }
        Ok(())
    }

    pub fn flip_config(&self) -> FlipConfig {
        FlipConfig {
            rise_multiplier: self.rise_multiplier,
            drop_multiplier: self.drop_multiplier,
        }
    }

    pub fn watcher_config(&self) -> WatcherConfig {
        WatcherConfig {
            product_id: self.product_id.clone(),
            polling_interval: self.polling_interval,
            max_missing_fetch: self.max_missing_fetch,
            event_capacity: self.event_capacity,
            flip: self.flip_config(),
        }
    }

    pub fn market_rules(&self) -> Result<Arc<MarketRules>, ConfigError> {
        load_market_rules(self.markets_file.as_deref()).map(Arc::new)
    }
}

/// Built-in rules, overlaid with `path` when given.
pub fn load_market_rules(path: Option<&Path>) -> Result<MarketRules, ConfigError> {
    let builtin = MarketRules::coinbase();
    match path {
        None => Ok(builtin),
        Some(path) => {
            let custom =
                MarketRules::from_file(path).map_err(|source| ConfigError::MarketRules {
                    path: path.to_path_buf(),
                    source,
                })?;
            Ok(builtin.merged(custom))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_defaults_are_valid() {
        let config = WatchConfig::default();
        config.validate().unwrap();

        let watcher = config.watcher_config();
        assert_eq!(watcher.polling_interval, Duration::from_secs(10));
        assert_eq!(watcher.max_missing_fetch, 10);
        assert_eq!(watcher.flip.drop_multiplier, dec!(0.98));
        assert_eq!(watcher.flip.rise_multiplier, dec!(1.01));
    }

    #[test]
    fn test_rejects_bad_values() {
        let config = WatchConfig {
            drop_multiplier: dec!(0),
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidMultiplier {
                name: "drop_multiplier",
                ..
            })
        ));

        let config = WatchConfig {
            polling_interval: Duration::ZERO,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::ZeroInterval)));

        let config = WatchConfig {
            max_missing_fetch: 0,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::ZeroFetchCap)));
    }

    #[test]
    fn test_market_rules_file() {
        let path = std::env::temp_dir().join(format!(
            "orderwatch-markets-{}.json",
            std::process::id()
        ));
        std::fs::write(&path, r#"{ "SOL-USD": { "price_decimals": 3, "size_decimals": 3 } }"#)
            .unwrap();

        let rules = load_market_rules(Some(&path)).unwrap();
        assert_eq!(rules.price_decimals("SOL-USD"), 3);
        assert_eq!(rules.size_decimals("BTC-USD"), 8);
        std::fs::remove_file(&path).unwrap();

        let err = load_market_rules(Some(Path::new("/nonexistent/markets.json"))).unwrap_err();
        assert!(matches!(err, ConfigError::MarketRules { .. }));
    }
}
