//! Order strategies driven by reconciliation events.
//!
//! - `FlipEngine` - counter-order on settlement
//! - `validators` - market-rule checks run before any placement

pub mod flip;
pub mod validators;

pub use flip::{FlipConfig, FlipEngine, FlipError, FlipPlan};
pub use validators::{CompositeValidator, OrderValidator};
