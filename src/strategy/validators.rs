//! Order validation against market rules.
//!
//! Provides composable validators run on a counter-order before it is placed.

use rust_decimal::Decimal;

use crate::exchange::LimitOrderParams;
use crate::markets::MarketRules;
use crate::math::is_rounded_to;

/// Trait for validating an order before submission.
/// Enables testable and composable validation logic.
pub trait OrderValidator: Send + Sync {
    /// Returns Ok(()) if valid, Err(msg) if invalid.
    fn validate(&self, order: &LimitOrderParams, rules: &MarketRules) -> Result<(), String>;
}

/// Size must lie within the market's inclusive bounds, when it has any.
#[derive(Debug, Clone)]
pub struct SizeBoundsValidator;

impl OrderValidator for SizeBoundsValidator {
    fn validate(&self, order: &LimitOrderParams, rules: &MarketRules) -> Result<(), String> {
        match rules.bounds_for(&order.product_id) {
            Some(bounds) if !bounds.contains(order.size) => Err(format!(
                "Size {} outside [{}, {}] for {}",
                order.size, bounds.min, bounds.max, order.product_id
            )),
            _ => Ok(()),
        }
    }
}

/// Size must already be rounded down to the market's size decimals.
#[derive(Debug, Clone)]
pub struct SizePrecisionValidator;

impl OrderValidator for SizePrecisionValidator {
    fn validate(&self, order: &LimitOrderParams, rules: &MarketRules) -> Result<(), String> {
        let decimals = rules.size_decimals(&order.product_id);
        if is_rounded_to(order.size, decimals) {
            Ok(())
        } else {
            Err(format!(
                "Size {} has more than {} decimals",
                order.size, decimals
            ))
        }
    }
}

/// Price must already be rounded to the market's price decimals.
#[derive(Debug, Clone)]
pub struct PricePrecisionValidator;

impl OrderValidator for PricePrecisionValidator {
    fn validate(&self, order: &LimitOrderParams, rules: &MarketRules) -> Result<(), String> {
        let decimals = rules.price_decimals(&order.product_id);
        if is_rounded_to(order.price, decimals) {
            Ok(())
        } else {
            Err(format!(
                "Price {} has more than {} decimals",
                order.price, decimals
            ))
        }
    }
}

/// Rejects zero or negative prices and sizes.
#[derive(Debug, Clone)]
pub struct PositiveValidator;

impl OrderValidator for PositiveValidator {
    fn validate(&self, order: &LimitOrderParams, _rules: &MarketRules) -> Result<(), String> {
        if order.price <= Decimal::ZERO {
            Err(format!("Invalid price: {} must be positive", order.price))
        } else if order.size <= Decimal::ZERO {
            Err(format!("Invalid size: {} must be positive", order.size))
        } else {
            Ok(())
        }
    }
}

/// Composite validator that chains multiple validators.
/// Fails on first validation error.
pub struct CompositeValidator {
    validators: Vec<Box<dyn OrderValidator>>,
}

impl CompositeValidator {
    pub fn new(validators: Vec<Box<dyn OrderValidator>>) -> Self {
        Self { validators }
    }

    /// Bounds and precision checks a counter-order must pass.
    pub fn market_rules() -> Self {
        Self::new(vec![
            Box::new(PositiveValidator),
            Box::new(SizeBoundsValidator),
            Box::new(SizePrecisionValidator),
            Box::new(PricePrecisionValidator),
        ])
    }
}

impl OrderValidator for CompositeValidator {
    fn validate(&self, order: &LimitOrderParams, rules: &MarketRules) -> Result<(), String> {
        for validator in &self.validators {
            validator.validate(order, rules)?;
        }
        Ok(())
    }
}
