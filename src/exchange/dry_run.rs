//! Dry-run wrapper.
//!
//! Reads go to the wrapped client; placements are logged and answered with a
//! synthetic pending order instead of reaching the exchange.

use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use rust_decimal::Decimal;
use tracing::info;

use super::{ExchangeError, LimitOrderParams, OrderClient, OrderQuery};
use crate::orders::{Order, OrderId, OrderStatus};
use crate::types::OrderSide;

pub struct DryRunClient<C> {
    inner: C,
    placed: AtomicU64,
}

impl<C: OrderClient> DryRunClient<C> {
    pub fn new(inner: C) -> Self {
        Self {
            inner,
            placed: AtomicU64::new(0),
        }
    }

    pub fn inner(&self) -> &C {
        &self.inner
    }

    fn simulate(&self, side: OrderSide, params: &LimitOrderParams) -> Order {
        let seq = self.placed.fetch_add(1, Ordering::SeqCst) + 1;
        info!(
            side = %side,
            product_id = %params.product_id,
            price = %params.price,
            size = %params.size,
            post_only = params.post_only,
            "-- DRY RUN: order not submitted --"
        );
        Order {
            id: OrderId::new(format!("dry-run-{}", seq)),
            product_id: params.product_id.clone(),
            side: Some(side),
            price: params.price,
            size: params.size,
            filled_size: Decimal::ZERO,
            status: OrderStatus::Pending,
            settled: false,
        }
    }
}

#[async_trait]
impl<C: OrderClient> OrderClient for DryRunClient<C> {
    async fn list_open_orders(&self, query: &OrderQuery) -> Result<Vec<Order>, ExchangeError> {
        self.inner.list_open_orders(query).await
    }

    async fn get_order(&self, id: &OrderId) -> Result<Order, ExchangeError> {
        self.inner.get_order(id).await
    }

    async fn place_buy(&self, params: &LimitOrderParams) -> Result<Order, ExchangeError> {
        Ok(self.simulate(OrderSide::Buy, params))
    }

    async fn place_sell(&self, params: &LimitOrderParams) -> Result<Order, ExchangeError> {
        Ok(self.simulate(OrderSide::Sell, params))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exchange::PaperExchange;
    use rust_decimal_macros::dec;

    #[tokio::test]
    async fn test_placements_never_reach_inner() {
        let client = DryRunClient::new(PaperExchange::new());
        let params = LimitOrderParams {
            product_id: "ETH-USD".to_string(),
            price: dec!(250.10),
            size: dec!(0.5),
            post_only: true,
        };

        let order = client.place_sell(&params).await.unwrap();
        assert_eq!(order.status, OrderStatus::Pending);
        assert_eq!(order.side, Some(OrderSide::Sell));
        assert!(client.inner().all_orders().await.is_empty());
    }
}
