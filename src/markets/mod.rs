//! Market Rules Table
//!
//! Per-market price/size precision and order size bounds. Lookups never
//! fail: an unknown market gets two decimals for both price and size and no
//! size bounds.

use std::collections::HashMap;
use std::path::Path;

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const DEFAULT_DECIMALS: u32 = 2;

/// Which quantity a precision lookup is for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecimalKind {
    Price,
    Size,
}

/// Inclusive order size range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SizeBounds {
    pub min: Decimal,
    pub max: Decimal,
}

impl SizeBounds {
    pub fn contains(&self, size: Decimal) -> bool {
        size >= self.min && size <= self.max
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarketRule {
    #[serde(default = "default_decimals")]
    pub price_decimals: u32,
    #[serde(default = "default_decimals")]
    pub size_decimals: u32,
    #[serde(default)]
    pub min_size: Option<Decimal>,
    #[serde(default)]
    pub max_size: Option<Decimal>,
}

fn default_decimals() -> u32 {
    DEFAULT_DECIMALS
}

impl MarketRule {
    pub fn new(price_decimals: u32, size_decimals: u32, min_size: Decimal, max_size: Decimal) -> Self {
        Self {
            price_decimals,
            size_decimals,
            min_size: Some(min_size),
            max_size: Some(max_size),
        }
    }
}

#[derive(Error, Debug)]
pub enum MarketRulesError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Immutable market id -> rule lookup.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MarketRules {
    rules: HashMap<String, MarketRule>,
}

impl MarketRules {
    pub fn new(rules: HashMap<String, MarketRule>) -> Self {
        Self { rules }
    }

    /// Coinbase Exchange books the flip heuristic was built for.
    pub fn coinbase() -> Self {
        let rules = [
            ("BTC-USD", MarketRule::new(2, 8, dec!(0.001), dec!(10000))),
            ("BTC-EUR", MarketRule::new(2, 8, dec!(0.001), dec!(10000))),
            ("ETH-USD", MarketRule::new(2, 8, dec!(0.01), dec!(5000))),
            ("ETH-EUR", MarketRule::new(2, 8, dec!(0.01), dec!(5000))),
            ("ETH-BTC", MarketRule::new(5, 8, dec!(0.01), dec!(600))),
            ("LTC-USD", MarketRule::new(2, 8, dec!(0.1), dec!(10000))),
            ("LTC-BTC", MarketRule::new(5, 8, dec!(0.1), dec!(2000))),
            ("BCH-USD", MarketRule::new(2, 8, dec!(0.01), dec!(350))),
        ];
        Self {
            rules: rules
                .into_iter()
                .map(|(market, rule)| (market.to_string(), rule))
                .collect(),
        }
    }

    /// Parse a `{ "BTC-USD": { "price_decimals": 2, ... } }` document.
    pub fn from_json(json: &str) -> Result<Self, MarketRulesError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, MarketRulesError> {
        let data = std::fs::read_to_string(path)?;
        Self::from_json(&data)
    }

    /// Overlay `other` on top of these rules; `other` wins per market.
    #[must_use]
    pub fn merged(mut self, other: MarketRules) -> Self {
        self.rules.extend(other.rules);
        self
    }

    pub fn get(&self, market: &str) -> Option<&MarketRule> {
        self.rules.get(market)
    }

    pub fn decimals_for(&self, market: &str, kind: DecimalKind) -> u32 {
        self.get(market)
            .map(|rule| match kind {
                DecimalKind::Price => rule.price_decimals,
                DecimalKind::Size => rule.size_decimals,
            })
            .unwrap_or(DEFAULT_DECIMALS)
    }

    pub fn price_decimals(&self, market: &str) -> u32 {
        self.decimals_for(market, DecimalKind::Price)
    }

    pub fn size_decimals(&self, market: &str) -> u32 {
        self.decimals_for(market, DecimalKind::Size)
    }

    /// `None` unless both bounds are configured; callers then skip the range check.
    pub fn bounds_for(&self, market: &str) -> Option<SizeBounds> {
        let rule = self.get(market)?;
        Some(SizeBounds {
            min: rule.min_size?,
            max: rule.max_size?,
        })
    }

    /// Markets sorted by id.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &MarketRule)> {
        let mut entries: Vec<_> = self.rules.iter().collect();
        entries.sort_by(|a, b| a.0.cmp(b.0));
        entries.into_iter()
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_market_defaults() {
        let rules = MarketRules::default();
        assert_eq!(rules.decimals_for("DOGE-USD", DecimalKind::Price), 2);
        assert_eq!(rules.decimals_for("DOGE-USD", DecimalKind::Size), 2);
        assert_eq!(rules.bounds_for("DOGE-USD"), None);
    }

    #[test]
    fn test_builtin_table() {
        let rules = MarketRules::coinbase();
        assert_eq!(rules.price_decimals("ETH-BTC"), 5);
        assert_eq!(rules.size_decimals("BTC-USD"), 8);
        let bounds = rules.bounds_for("BTC-USD").unwrap();
        assert!(bounds.contains(dec!(0.001)));
        assert!(bounds.contains(dec!(10000)));
        assert!(!bounds.contains(dec!(0.0009)));
    }

    #[test]
    fn test_json_overlay() {
        let custom = MarketRules::from_json(
            r#"{
                "BTC-USD": { "price_decimals": 2, "size_decimals": 4, "min_size": "0.001", "max_size": "10" },
                "XRP-USD": { "price_decimals": 4 }
            }"#,
        )
        .unwrap();
        let rules = MarketRules::coinbase().merged(custom);

        assert_eq!(rules.size_decimals("BTC-USD"), 4);
        assert_eq!(rules.bounds_for("BTC-USD").unwrap().max, dec!(10));
        assert_eq!(rules.price_decimals("XRP-USD"), 4);
        assert_eq!(rules.size_decimals("XRP-USD"), 2);
        // Half-configured bounds are treated as absent.
        assert_eq!(rules.bounds_for("XRP-USD"), None);
    }

    #[test]
    fn test_invalid_json() {
        assert!(matches!(
            MarketRules::from_json("[1, 2]"),
            Err(MarketRulesError::Json(_))
        ));
    }
}
