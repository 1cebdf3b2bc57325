//! Health check HTTP endpoint for monitoring

use crate::exchange::OrderClient;
use crate::metrics;
use crate::orders::OrderWatcher;
use axum::{routing::get, Json, Router};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

/// Consecutive failed cycles before the watcher is reported critical
pub const CRITICAL_FAILURES: u32 = 3;

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct HealthResponse {
    pub status: String, // "healthy", "degraded", "critical"
    pub version: String,
    pub phase: String,
    pub known_orders: usize,
    pub cycles_completed: u64,
    pub cycles_failed: u64,
    pub consecutive_failures: u32,
    pub last_cycle: Option<String>, // "completed" or "failed"
    pub last_snapshot_at: Option<i64>,
    pub timestamp: i64,
}

impl Default for HealthResponse {
    fn default() -> Self {
        Self {
            status: "healthy".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            phase: "idle".to_string(),
            known_orders: 0,
            cycles_completed: 0,
            cycles_failed: 0,
            consecutive_failures: 0,
            last_cycle: None,
            last_snapshot_at: None,
            timestamp: Utc::now().timestamp(),
        }
    }
}

pub type HealthState = Arc<RwLock<HealthResponse>>;

pub fn create_health_state() -> HealthState {
    Arc::new(RwLock::new(HealthResponse::default()))
}

fn last_cycle_for(completed: u64, consecutive_failures: u32) -> Option<&'static str> {
    if consecutive_failures > 0 {
        Some("failed")
    } else if completed > 0 {
        Some("completed")
    } else {
        None
    }
}

fn status_for(consecutive_failures: u32) -> &'static str {
    match consecutive_failures {
        0 => "healthy",
        n if n < CRITICAL_FAILURES => "degraded",
        _ => "critical",
    }
}

/// Copy the watcher's counters into the shared health state
pub async fn update_from_watcher<C: OrderClient>(state: &HealthState, watcher: &OrderWatcher<C>) {
    let known = watcher.known_orders();
    let known_orders = known.len().await;
    let last_snapshot_at = known.updated_at().await.map(|t| t.timestamp());

    let mut health = state.write().await;
    health.phase = watcher.phase().to_string();
    health.known_orders = known_orders;
    health.cycles_completed = watcher.cycles_completed();
    health.cycles_failed = watcher.cycles_failed();
    health.consecutive_failures = watcher.consecutive_failures();
    health.last_cycle =
        last_cycle_for(health.cycles_completed, health.consecutive_failures).map(String::from);
    health.last_snapshot_at = last_snapshot_at;
    health.status = status_for(health.consecutive_failures).to_string();
    health.timestamp = Utc::now().timestamp();
}

/// Refresh the health state from the watcher every `interval`.
pub fn spawn_health_updater<C: OrderClient + 'static>(
    state: HealthState,
    watcher: Arc<OrderWatcher<C>>,
    interval: Duration,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval.max(Duration::from_millis(1)));
        loop {
            ticker.tick().await;
            update_from_watcher(&state, &watcher).await;
        }
    })
}

async fn health_check(
    axum::extract::State(state): axum::extract::State<HealthState>,
) -> Json<HealthResponse> {
    let health = state.read().await.clone();
    Json(health)
}

async fn metrics_endpoint() -> String {
    metrics::gather_metrics()
}

pub fn router(state: HealthState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/metrics", get(metrics_endpoint))
        .with_state(state)
}

pub async fn run_health_server(port: u16, state: HealthState) {
    let app = router(state);
    let addr = SocketAddr::from(([0, 0, 0, 0], port));

    tracing::info!("Health check server listening on {}", addr);

    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(l) => l,
        Err(e) => {
            tracing::error!("Health server failed to bind to {}: {}. Watcher will continue without health endpoint.", addr, e);
            return;
        }
    };

    if let Err(e) = axum::serve(listener, app).await {
        tracing::error!("Health check server failed: {}", e);
    }
}
