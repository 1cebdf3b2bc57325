//! Markets command handler.

use std::path::PathBuf;

use crate::cli::load_market_rules;
use crate::markets::MarketRules;

/// Print the effective market rules, built-in table plus any override file.
pub fn run_markets(
    markets_file: Option<PathBuf>,
    json: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let rules = load_market_rules(markets_file.as_deref())?;

    if json {
        println!("{}", serde_json::to_string_pretty(&rules)?);
    } else {
        for line in render_table(&rules) {
            println!("{}", line);
        }
    }
    Ok(())
}

fn render_table(rules: &MarketRules) -> Vec<String> {
    let fmt_bound = |bound: Option<rust_decimal::Decimal>| {
        bound.map(|b| b.normalize().to_string()).unwrap_or_else(|| "-".to_string())
    };

    let mut lines = vec![
        format!(
            "{:<10} | {:>8} | {:>8} | {:>10} | {:>10}",
            "Market", "Price dp", "Size dp", "Min size", "Max size"
        ),
        "-".repeat(58),
    ];
    for (market, rule) in rules.iter() {
        lines.push(format!(
            "{:<10} | {:>8} | {:>8} | {:>10} | {:>10}",
            market,
            rule.price_decimals,
            rule.size_decimals,
            fmt_bound(rule.min_size),
            fmt_bound(rule.max_size),
        ));
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_table_is_sorted() {
        let lines = render_table(&MarketRules::coinbase());
        assert_eq!(lines.len(), 2 + 8);
        assert!(lines[2].starts_with("BCH-USD"));
        assert!(lines[3].starts_with("BTC-EUR"));
        assert!(lines[2].contains("0.01"));
    }
}
