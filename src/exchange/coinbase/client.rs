//! Coinbase Exchange REST client
//!
//! Signs every request with the `CB-ACCESS-*` headers and maps HTTP 404 to
//! `ExchangeError::NotFound`, which is how the venue reports a cancelled order.
//! Open-order listings are paginated; the `CB-AFTER` cursor is followed until
//! a short page comes back.

use std::num::NonZeroU32;
use std::sync::Arc;

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use chrono::Utc;
use governor::{clock::DefaultClock, state::InMemoryState, Quota, RateLimiter};
use hmac::{Hmac, Mac};
use reqwest::header::{CONTENT_TYPE, USER_AGENT};
use reqwest::{Method, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use sha2::Sha256;
use tracing::{debug, info};

use crate::exchange::{ExchangeConfig, ExchangeError, LimitOrderParams, OrderClient, OrderQuery};
use crate::orders::{Order, OrderId};
use crate::types::OrderSide;

pub const LIVE_URL: &str = "https://api.exchange.coinbase.com";
pub const SANDBOX_URL: &str = "https://api-public.sandbox.exchange.coinbase.com";

/// Orders per listing page (the venue's default).
pub const PAGE_LIMIT: usize = 100;

type HmacSha256 = Hmac<Sha256>;
type DirectRateLimiter =
    RateLimiter<governor::state::direct::NotKeyed, InMemoryState, DefaultClock>;

/// Authenticated Coinbase Exchange client implementing `OrderClient`.
pub struct CoinbaseClient {
    http: reqwest::Client,
    base_url: String,
    config: ExchangeConfig,
    // Private endpoints allow 10 req/sec
    rate_limiter: Arc<DirectRateLimiter>,
    timestamp_fn: Arc<dyn Fn() -> String + Send + Sync>,
}

#[derive(Deserialize)]
struct ApiMessage {
    message: String,
}

struct ApiResponse {
    body: String,
    // Pagination cursor for the next (older) page
    after: Option<String>,
}

impl CoinbaseClient {
    /// Create a client for the live or sandbox venue, per `config.sandbox`.
    pub fn new(config: ExchangeConfig) -> Result<Self, ExchangeError> {
        let base_url = if config.sandbox { SANDBOX_URL } else { LIVE_URL };
        // Fail early on a secret that cannot sign anything.
        STANDARD
            .decode(&config.api_secret)
            .map_err(|e| ExchangeError::Configuration(format!("API secret is not base64: {}", e)))?;

        let http = reqwest::Client::builder()
            .build()
            .map_err(|e| ExchangeError::Configuration(e.to_string()))?;

        const RATE_LIMIT: u32 = 10;
        let quota = Quota::per_second(
            NonZeroU32::new(RATE_LIMIT).expect("RATE_LIMIT is non-zero constant"),
        );

        info!(base_url = base_url, "Initializing Coinbase Exchange client");

        Ok(Self {
            http,
            base_url: base_url.to_string(),
            config,
            rate_limiter: Arc::new(RateLimiter::direct(quota)),
            timestamp_fn: Arc::new(|| Utc::now().timestamp().to_string()),
        })
    }

    /// Point the client at another host (tests, proxies).
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Override the request timestamp source.
    #[must_use]
    pub fn with_timestamp_fn(mut self, f: Arc<dyn Fn() -> String + Send + Sync>) -> Self {
        self.timestamp_fn = f;
        self
    }

    async fn send(
        &self,
        method: Method,
        path: &str,
        body: Option<String>,
    ) -> Result<ApiResponse, ExchangeError> {
        self.rate_limiter.until_ready().await;

        let timestamp = (self.timestamp_fn)();
        let payload = body.as_deref().unwrap_or("");
        let signature = sign_request(
            &self.config.api_secret,
            &timestamp,
            method.as_str(),
            path,
            payload,
        )?;

        let mut request = self
            .http
            .request(method.clone(), format!("{}{}", self.base_url, path))
            .header(USER_AGENT, concat!("orderwatch/", env!("CARGO_PKG_VERSION")))
            .header("CB-ACCESS-KEY", &self.config.api_key)
            .header("CB-ACCESS-SIGN", signature)
            .header("CB-ACCESS-TIMESTAMP", &timestamp)
            .header("CB-ACCESS-PASSPHRASE", &self.config.passphrase);
        if let Some(body) = body {
            request = request.header(CONTENT_TYPE, "application/json").body(body);
        }

        let resp = request
            .send()
            .await
            .map_err(|e| ExchangeError::Network(e.to_string()))?;
        let status = resp.status();
        let after = resp
            .headers()
            .get("CB-AFTER")
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let text = resp
            .text()
            .await
            .map_err(|e| ExchangeError::Network(e.to_string()))?;

        debug!(method = %method, path = path, status = status.as_u16(), "Coinbase response");

        if status == StatusCode::NOT_FOUND {
            return Err(ExchangeError::NotFound(path.to_string()));
        }
        if !status.is_success() {
            let message = serde_json::from_str::<ApiMessage>(&text)
                .map(|m| m.message)
                .unwrap_or(text);
            return Err(ExchangeError::Api {
                status: status.as_u16(),
                message,
            });
        }
        Ok(ApiResponse { body: text, after })
    }

    async fn send_json<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: Option<String>,
    ) -> Result<T, ExchangeError> {
        let resp = self.send(method, path, body).await?;
        decode(&resp.body)
    }

    async fn place_limit(
        &self,
        side: OrderSide,
        params: &LimitOrderParams,
    ) -> Result<Order, ExchangeError> {
        let body = serde_json::json!({
            "type": "limit",
            "side": side,
            "product_id": params.product_id,
            "price": params.price.to_string(),
            "size": params.size.to_string(),
            "post_only": params.post_only,
        });
        info!(
            side = %side,
            product_id = %params.product_id,
            price = %params.price,
            size = %params.size,
            "Placing limit order"
        );
        self.send_json(Method::POST, "/orders", Some(body.to_string()))
            .await
    }
}

fn decode<T: DeserializeOwned>(body: &str) -> Result<T, ExchangeError> {
    serde_json::from_str(body).map_err(|e| ExchangeError::Decode(e.to_string()))
}

/// `base64(HMAC-SHA256(base64decode(secret), timestamp + method + path + body))`
pub fn sign_request(
    secret: &str,
    timestamp: &str,
    method: &str,
    path: &str,
    body: &str,
) -> Result<String, ExchangeError> {
    let key = STANDARD
        .decode(secret)
        .map_err(|e| ExchangeError::Configuration(format!("API secret is not base64: {}", e)))?;
    let mut mac = HmacSha256::new_from_slice(&key)
        .map_err(|e| ExchangeError::Configuration(e.to_string()))?;
    mac.update(timestamp.as_bytes());
    mac.update(method.as_bytes());
    mac.update(path.as_bytes());
    mac.update(body.as_bytes());
    Ok(STANDARD.encode(mac.finalize().into_bytes()))
}

#[async_trait]
impl OrderClient for CoinbaseClient {
    async fn list_open_orders(&self, query: &OrderQuery) -> Result<Vec<Order>, ExchangeError> {
        let base = match &query.product_id {
            Some(market) => format!(
                "/orders?status=open&limit={}&product_id={}",
                PAGE_LIMIT, market
            ),
            None => format!("/orders?status=open&limit={}", PAGE_LIMIT),
        };

        let mut orders: Vec<Order> = Vec::new();
        let mut cursor: Option<String> = None;
        loop {
            let path = match &cursor {
                Some(after) => format!("{}&after={}", base, after),
                None => base.clone(),
            };
            let resp = self.send(Method::GET, &path, None).await?;
            let page: Vec<Order> = decode(&resp.body)?;
            let full = page.len() >= PAGE_LIMIT;
            orders.extend(page);

            match resp.after {
                Some(after) if full && cursor.as_deref() != Some(after.as_str()) => {
                    debug!(
                        after = %after,
                        fetched = orders.len(),
                        "Fetching next page of open orders"
                    );
                    cursor = Some(after);
                }
                _ => break,
            }
        }
        Ok(orders)
    }

    async fn get_order(&self, id: &OrderId) -> Result<Order, ExchangeError> {
        self.send_json(Method::GET, &format!("/orders/{}", id), None)
            .await
    }

    async fn place_buy(&self, params: &LimitOrderParams) -> Result<Order, ExchangeError> {
        self.place_limit(OrderSide::Buy, params).await
    }

    async fn place_sell(&self, params: &LimitOrderParams) -> Result<Order, ExchangeError> {
        self.place_limit(OrderSide::Sell, params).await
    }
}
