//! Exchange Abstraction Layer
//!
//! The reconciliation engine only needs four capabilities from an exchange:
//! list open orders, look one order up by id, and place a limit buy or sell.
//! `OrderClient` captures exactly that; transport and authentication live in
//! the adapters.

pub mod coinbase;
pub mod dry_run;
pub mod paper;

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::Serialize;
use thiserror::Error;

use crate::orders::{Order, OrderId};
use crate::types::OrderSide;

pub use coinbase::CoinbaseClient;
pub use dry_run::DryRunClient;
pub use paper::PaperExchange;

/// Errors surfaced by exchange adapters.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ExchangeError {
    /// The requested record does not exist (HTTP 404)
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Network error: {0}")]
    Network(String),

    /// Non-success response other than 404
    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("Decode error: {0}")]
    Decode(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("{0}")]
    Other(String),
}

impl ExchangeError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

/// Filter for the open-orders listing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OrderQuery {
    /// Restrict to one market; `None` lists every market
    pub product_id: Option<String>,
}

impl OrderQuery {
    pub fn for_market(product_id: impl Into<String>) -> Self {
        Self {
            product_id: Some(product_id.into()),
        }
    }
}

/// Limit order parameters for `place_buy` / `place_sell`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LimitOrderParams {
    pub product_id: String,
    pub price: Decimal,
    pub size: Decimal,
    pub post_only: bool,
}

/// Core trait for order access - exchange implementations must provide this
#[async_trait]
pub trait OrderClient: Send + Sync {
    /// Currently open orders only. Absence is the only cancel/settle signal.
    async fn list_open_orders(&self, query: &OrderQuery) -> Result<Vec<Order>, ExchangeError>;

    /// Fails with `ExchangeError::NotFound` once a cancelled order is purged.
    async fn get_order(&self, id: &OrderId) -> Result<Order, ExchangeError>;

    /// A `rejected` status in the returned order is a normal response.
    async fn place_buy(&self, params: &LimitOrderParams) -> Result<Order, ExchangeError>;

    async fn place_sell(&self, params: &LimitOrderParams) -> Result<Order, ExchangeError>;

    /// Place on the given side.
    async fn place(
        &self,
        side: OrderSide,
        params: &LimitOrderParams,
    ) -> Result<Order, ExchangeError> {
        match side {
            OrderSide::Buy => self.place_buy(params).await,
            OrderSide::Sell => self.place_sell(params).await,
        }
    }
}

#[async_trait]
impl<C: OrderClient + ?Sized> OrderClient for std::sync::Arc<C> {
    async fn list_open_orders(&self, query: &OrderQuery) -> Result<Vec<Order>, ExchangeError> {
        (**self).list_open_orders(query).await
    }

    async fn get_order(&self, id: &OrderId) -> Result<Order, ExchangeError> {
        (**self).get_order(id).await
    }

    async fn place_buy(&self, params: &LimitOrderParams) -> Result<Order, ExchangeError> {
        (**self).place_buy(params).await
    }

    async fn place_sell(&self, params: &LimitOrderParams) -> Result<Order, ExchangeError> {
        (**self).place_sell(params).await
    }
}

/// Credentials and endpoint for the REST adapter
#[derive(Debug, Clone)]
pub struct ExchangeConfig {
    pub api_key: String,
    /// Base64-encoded secret as issued by the exchange
    pub api_secret: String,
    pub passphrase: String,
    pub sandbox: bool,
}

impl ExchangeConfig {
    pub const KEY_VAR: &'static str = "COINBASE_API_KEY";
    pub const SECRET_VAR: &'static str = "COINBASE_API_SECRET";
    pub const PASSPHRASE_VAR: &'static str = "COINBASE_API_PASSPHRASE";

    /// Create config from environment variables
    pub fn from_env(sandbox: bool) -> Result<Self, ExchangeError> {
        let read = |var: &str| {
            std::env::var(var).map_err(|_| {
                ExchangeError::Configuration(format!("{} must be set in environment", var))
            })
        };

        Ok(Self {
            api_key: read(Self::KEY_VAR)?,
            api_secret: read(Self::SECRET_VAR)?,
            passphrase: read(Self::PASSPHRASE_VAR)?,
            sandbox,
        })
    }
}
