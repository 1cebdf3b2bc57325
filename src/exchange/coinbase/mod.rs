//! Coinbase Exchange Implementation
//!
//! REST adapter for the Coinbase Exchange (formerly GDAX) order endpoints,
//! implementing `OrderClient`.

mod client;

pub use client::{sign_request, CoinbaseClient, LIVE_URL, SANDBOX_URL};
