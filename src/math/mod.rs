//! Numeric utilities for order pricing.

pub mod rounding;

pub use rounding::{ceil_dp, floor_dp, is_rounded_to};
