//! In-memory exchange.
//!
//! Keeps an order book keyed by id and behaves like the live venue where the
//! reconciliation engine can observe it: only open orders are listed, settled
//! orders stay retrievable by id, and cancelled orders disappear entirely.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

use async_trait::async_trait;
use rust_decimal::Decimal;
use tokio::sync::RwLock;
use tracing::debug;

use super::{ExchangeError, LimitOrderParams, OrderClient, OrderQuery};
use crate::orders::{Order, OrderId, OrderStatus};
use crate::types::OrderSide;

#[derive(Default)]
struct Book {
    /// Insertion order, so listings are stable
    sequence: Vec<OrderId>,
    orders: HashMap<OrderId, Order>,
}

/// Paper exchange with settle/cancel controls and fault injection.
#[derive(Default)]
pub struct PaperExchange {
    book: RwLock<Book>,
    next_id: AtomicU64,
    list_calls: AtomicUsize,
    get_calls: AtomicUsize,
    list_failure: RwLock<Option<ExchangeError>>,
    get_failure: RwLock<Option<ExchangeError>>,
    reject_placements: RwLock<bool>,
}

impl PaperExchange {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace an order as-is.
    pub async fn insert(&self, order: Order) {
        let mut book = self.book.write().await;
        if !book.orders.contains_key(&order.id) {
            book.sequence.push(order.id.clone());
        }
        book.orders.insert(order.id.clone(), order);
    }

    /// Fully fill an order. It leaves the open listing but stays retrievable.
    pub async fn settle(&self, id: &OrderId) -> Option<Order> {
        let mut book = self.book.write().await;
        let order = book.orders.get_mut(id)?;
        order.filled_size = order.size;
        order.status = OrderStatus::Done;
        order.settled = true;
        debug!(order_id = %id, "Paper order settled");
        Some(order.clone())
    }

    /// Partially fill an order, keeping it open.
    pub async fn fill(&self, id: &OrderId, filled_size: Decimal) -> Option<Order> {
        let mut book = self.book.write().await;
        let order = book.orders.get_mut(id)?;
        order.filled_size = filled_size;
        Some(order.clone())
    }

    /// Cancel an order. Like the live venue, it is purged and will 404.
    pub async fn cancel(&self, id: &OrderId) -> bool {
        let mut book = self.book.write().await;
        book.sequence.retain(|known| known != id);
        book.orders.remove(id).is_some()
    }

    /// Make every subsequent listing fail until cleared.
    pub async fn fail_listing(&self, error: Option<ExchangeError>) {
        *self.list_failure.write().await = error;
    }

    /// Make every subsequent by-id lookup fail until cleared.
    pub async fn fail_lookups(&self, error: Option<ExchangeError>) {
        *self.get_failure.write().await = error;
    }

    /// Return placements with a `rejected` status, as post-only crossing does.
    pub async fn reject_placements(&self, reject: bool) {
        *self.reject_placements.write().await = reject;
    }

    pub fn list_calls(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }

    pub fn get_calls(&self) -> usize {
        self.get_calls.load(Ordering::SeqCst)
    }

    /// Every order ever placed or inserted and not cancelled.
    pub async fn all_orders(&self) -> Vec<Order> {
        let book = self.book.read().await;
        book.sequence
            .iter()
            .filter_map(|id| book.orders.get(id))
            .cloned()
            .collect()
    }

    async fn submit(
        &self,
        side: OrderSide,
        params: &LimitOrderParams,
    ) -> Result<Order, ExchangeError> {
        let seq = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        let mut order = Order {
            id: OrderId::new(format!("paper-{}", seq)),
            product_id: params.product_id.clone(),
            side: Some(side),
            price: params.price,
            size: params.size,
            filled_size: Decimal::ZERO,
            status: OrderStatus::Pending,
            settled: false,
        };

        if *self.reject_placements.read().await {
            order.status = OrderStatus::Rejected;
            return Ok(order);
        }

        order.status = OrderStatus::Open;
        self.insert(order.clone()).await;
        Ok(order)
    }
}

fn is_open(order: &Order) -> bool {
    !order.settled
        && matches!(
            order.status,
            OrderStatus::Open | OrderStatus::Pending | OrderStatus::Active
        )
}

#[async_trait]
impl OrderClient for PaperExchange {
    async fn list_open_orders(&self, query: &OrderQuery) -> Result<Vec<Order>, ExchangeError> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(err) = self.list_failure.read().await.clone() {
            return Err(err);
        }

        let book = self.book.read().await;
        Ok(book
            .sequence
            .iter()
            .filter_map(|id| book.orders.get(id))
            .filter(|o| is_open(o))
            .filter(|o| {
                query
                    .product_id
                    .as_deref()
                    .map_or(true, |market| o.product_id == market)
            })
            .cloned()
            .collect())
    }

    async fn get_order(&self, id: &OrderId) -> Result<Order, ExchangeError> {
        self.get_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(err) = self.get_failure.read().await.clone() {
            return Err(err);
        }

        let book = self.book.read().await;
        book.orders
            .get(id)
            .cloned()
            .ok_or_else(|| ExchangeError::NotFound(id.to_string()))
    }

    async fn place_buy(&self, params: &LimitOrderParams) -> Result<Order, ExchangeError> {
        self.submit(OrderSide::Buy, params).await
    }

    async fn place_sell(&self, params: &LimitOrderParams) -> Result<Order, ExchangeError> {
        self.submit(OrderSide::Sell, params).await
    }
}
