//! Flip engine.
//!
//! Turns a settled order into a post-only counter-order on the opposite side
//! near the settlement price. Both directions price off `drop_multiplier`:
//!
//! - buy settled at `p` for `q`: sell `q` at `ceil(p * drop)`
//! - sell settled at `p` for `q`: buy `floor(p / p' * q)` at `p' = ceil(p * drop)`
//!
//! `rise_multiplier` is carried in the configuration but takes no part in
//! pricing.

use std::sync::Arc;

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use thiserror::Error;
use tracing::{debug, info, warn};

use super::validators::{CompositeValidator, OrderValidator};
use crate::exchange::{ExchangeError, LimitOrderParams, OrderClient};
use crate::markets::MarketRules;
use crate::math::{ceil_dp, floor_dp};
use crate::metrics;
use crate::orders::{Order, OrderStatus};
use crate::types::OrderSide;

pub const DEFAULT_RISE_MULTIPLIER: Decimal = dec!(1.01);
pub const DEFAULT_DROP_MULTIPLIER: Decimal = dec!(0.98);

#[derive(Error, Debug, Clone, PartialEq)]
pub enum FlipError {
    /// The exchange accepted the request but answered with `rejected`
    #[error("{side} order at {price} was rejected")]
    Rejected { side: OrderSide, price: Decimal },

    #[error("Exchange error: {0}")]
    Exchange(#[from] ExchangeError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FlipConfig {
    pub rise_multiplier: Decimal,
    pub drop_multiplier: Decimal,
}

impl Default for FlipConfig {
    fn default() -> Self {
        Self {
            rise_multiplier: DEFAULT_RISE_MULTIPLIER,
            drop_multiplier: DEFAULT_DROP_MULTIPLIER,
        }
    }
}

/// A counter-order ready to submit.
#[derive(Debug, Clone, PartialEq)]
pub struct FlipPlan {
    pub side: OrderSide,
    pub params: LimitOrderParams,
}

pub struct FlipEngine {
    config: FlipConfig,
    rules: Arc<MarketRules>,
    validator: Box<dyn OrderValidator>,
}

impl FlipEngine {
    pub fn new(config: FlipConfig, rules: Arc<MarketRules>) -> Self {
        Self {
            config,
            rules,
            validator: Box::new(CompositeValidator::market_rules()),
        }
    }

    /// Derive the counter-order for `settled`, or `None` when the order fails
    /// the guard (no side, nothing filled, no market) or validation.
    pub fn plan(&self, settled: &Order) -> Option<FlipPlan> {
        let side = match settled.side {
            Some(side) if !settled.filled_size.is_zero() && !settled.product_id.is_empty() => side,
            _ => {
                debug!(order_id = %settled.id, "Order not eligible for flip");
                return None;
            }
        };

        let market = settled.product_id.as_str();
        let price_decimals = self.rules.price_decimals(market);
        let size_decimals = self.rules.size_decimals(market);

        let new_price = ceil_dp(
            settled.price.checked_mul(self.config.drop_multiplier)?,
            price_decimals,
        );

        let new_size = match side {
            OrderSide::Buy => settled.filled_size,
            OrderSide::Sell => {
                if new_price.is_zero() {
                    warn!(order_id = %settled.id, "Flip price rounds to zero, skipping");
                    return None;
                }
                let notional_ratio = settled.price.checked_div(new_price)?;
                floor_dp(
                    notional_ratio.checked_mul(settled.filled_size)?,
                    size_decimals,
                )
            }
        };

        let params = LimitOrderParams {
            product_id: market.to_string(),
            price: new_price,
            size: new_size,
            post_only: true,
        };

        if let Err(reason) = self.validator.validate(&params, &self.rules) {
            warn!(
                order_id = %settled.id,
                product_id = %market,
                price = %new_price,
                size = %new_size,
                reason = %reason,
                "Flip order failed validation, skipping"
            );
            return None;
        }

        Some(FlipPlan {
            side: side.opposite(),
            params,
        })
    }

    /// Plan and submit the counter-order.
    ///
    /// `Ok(None)` means the flip was skipped. A placement the exchange
    /// answers with `rejected` is an error.
    pub async fn flip<C: OrderClient + ?Sized>(
        &self,
        client: &C,
        settled: &Order,
    ) -> Result<Option<Order>, FlipError> {
        let Some(plan) = self.plan(settled) else {
            return Ok(None);
        };

        let side_label = plan.side.to_string();
        let placed = match client.place(plan.side, &plan.params).await {
            Ok(order) => order,
            Err(e) => {
                metrics::record_flip(&side_label, false);
                return Err(e.into());
            }
        };

        if placed.status == OrderStatus::Rejected {
            metrics::record_flip(&side_label, false);
            return Err(FlipError::Rejected {
                side: plan.side,
                price: plan.params.price,
            });
        }

        metrics::record_flip(&side_label, true);
        info!(
            settled_id = %settled.id,
            order_id = %placed.id,
            side = %plan.side,
            product_id = %plan.params.product_id,
            price = %plan.params.price,
            size = %plan.params.size,
            "Flip order placed"
        );
        Ok(Some(placed))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exchange::PaperExchange;
    use crate::markets::MarketRule;
    use crate::orders::OrderId;
    use std::collections::HashMap;

    fn engine() -> FlipEngine {
        let rules = MarketRules::new(HashMap::from([(
            "BTC-USD".to_string(),
            MarketRule::new(2, 4, dec!(0.001), dec!(10)),
        )]));
        FlipEngine::new(FlipConfig::default(), Arc::new(rules))
    }

    fn settled(side: OrderSide, price: Decimal, filled: Decimal) -> Order {
        Order {
            id: OrderId::new("settled-1"),
            product_id: "BTC-USD".to_string(),
            side: Some(side),
            price,
            size: filled,
            filled_size: filled,
            status: OrderStatus::Done,
            settled: true,
        }
    }

    #[test]
    fn test_settled_buy_flips_to_sell() {
        let plan = engine()
            .plan(&settled(OrderSide::Buy, dec!(100.00), dec!(1.0000)))
            .unwrap();
        assert_eq!(plan.side, OrderSide::Sell);
        assert_eq!(plan.params.price, dec!(98.00));
        assert_eq!(plan.params.size, dec!(1.0000));
        assert!(plan.params.post_only);
    }

    #[test]
    fn test_settled_sell_preserves_notional() {
        let plan = engine()
            .plan(&settled(OrderSide::Sell, dec!(100.00), dec!(1.0000)))
            .unwrap();
        assert_eq!(plan.side, OrderSide::Buy);
        assert_eq!(plan.params.price, dec!(98.00));
        assert_eq!(plan.params.size, dec!(1.0204));
    }

    #[test]
    fn test_price_rounds_up() {
        // 101.01 * 0.98 = 98.9898
        let plan = engine()
            .plan(&settled(OrderSide::Buy, dec!(101.01), dec!(0.5)))
            .unwrap();
        assert_eq!(plan.params.price, dec!(98.99));
    }

    #[test]
    fn test_guard() {
        let engine = engine();
        let mut order = settled(OrderSide::Buy, dec!(100), dec!(1));
        order.side = None;
        assert!(engine.plan(&order).is_none());

        let order = settled(OrderSide::Buy, dec!(100), Decimal::ZERO);
        assert!(engine.plan(&order).is_none());

        let mut order = settled(OrderSide::Buy, dec!(100), dec!(1));
        order.product_id.clear();
        assert!(engine.plan(&order).is_none());
    }

    #[test]
    fn test_out_of_bounds_is_skipped() {
        assert!(engine()
            .plan(&settled(OrderSide::Buy, dec!(100), dec!(11)))
            .is_none());
    }

    #[test]
    fn test_zero_price_sell_is_skipped() {
        assert!(engine()
            .plan(&settled(OrderSide::Sell, Decimal::ZERO, dec!(1)))
            .is_none());
    }

    #[tokio::test]
    async fn test_flip_places_post_only_order() {
        let exchange = PaperExchange::new();
        let placed = engine()
            .flip(&exchange, &settled(OrderSide::Buy, dec!(100.00), dec!(1.0000)))
            .await
            .unwrap()
            .unwrap();

        assert_eq!(placed.side, Some(OrderSide::Sell));
        assert_eq!(placed.price, dec!(98.00));
        assert_eq!(exchange.all_orders().await, vec![placed]);
    }

    #[tokio::test]
    async fn test_rejected_placement_is_an_error() {
        let exchange = PaperExchange::new();
        exchange.reject_placements(true).await;

        let err = engine()
            .flip(&exchange, &settled(OrderSide::Sell, dec!(100.00), dec!(1.0000)))
            .await
            .unwrap_err();
        assert_eq!(
            err,
            FlipError::Rejected {
                side: OrderSide::Buy,
                price: dec!(98.00)
            }
        );
    }

    #[tokio::test]
    async fn test_skipped_flip_places_nothing() {
        let exchange = PaperExchange::new();
        let result = engine()
            .flip(&exchange, &settled(OrderSide::Buy, dec!(100), dec!(50)))
            .await
            .unwrap();
        assert!(result.is_none());
        assert!(exchange.all_orders().await.is_empty());
    }
}
