//! Order reconciliation loop.
//!
//! Each cycle fetches the open-orders snapshot, diffs it against the previous
//! one, resolves orders that disappeared, and publishes events. Only one
//! cycle runs at a time; a tick that arrives mid-cycle is skipped.

use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use thiserror::Error;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info};

use super::diff::group_orders;
use super::resolver::{resolve_missing, DEFAULT_MAX_MISSING_FETCH};
use super::tracker::KnownOrders;
use super::types::{Order, OrderGroups};
use crate::events::{events_for, EventBus, OrderEvent, DEFAULT_EVENT_CAPACITY};
use crate::exchange::{ExchangeError, OrderClient, OrderQuery};
use crate::markets::MarketRules;
use crate::metrics;
use crate::strategy::{FlipConfig, FlipEngine, FlipError};

/// Errors that abort a reconciliation cycle.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum WatchError {
    /// Open-orders listing failed; nothing changed
    #[error("Failed to fetch open orders: {0}")]
    Fetch(ExchangeError),

    /// A missing-order lookup failed; the snapshot was already replaced
    #[error("Failed to resolve missing orders: {0}")]
    Resolve(ExchangeError),
}

/// Phase of the current cycle (encoded as u32 for atomic operations).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum CyclePhase {
    Idle = 0,
    Fetching = 1,
    Diffing = 2,
    Resolving = 3,
    Emitting = 4,
}

impl CyclePhase {
    fn from_u32(v: u32) -> Self {
        match v {
            1 => CyclePhase::Fetching,
            2 => CyclePhase::Diffing,
            3 => CyclePhase::Resolving,
            4 => CyclePhase::Emitting,
            _ => CyclePhase::Idle,
        }
    }
}

impl std::fmt::Display for CyclePhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::Fetching => write!(f, "fetching"),
            Self::Diffing => write!(f, "diffing"),
            Self::Resolving => write!(f, "resolving"),
            Self::Emitting => write!(f, "emitting"),
        }
    }
}

/// Result of a `check_orders` call that did not fail.
#[derive(Debug, Clone, PartialEq)]
pub enum CycleOutcome {
    Completed(OrderGroups),
    /// Another cycle was already in flight
    Skipped,
}

/// Configuration for the order watcher.
#[derive(Debug, Clone)]
pub struct WatcherConfig {
    /// Restrict the snapshot to one market
    pub product_id: Option<String>,
    pub polling_interval: Duration,
    /// Missing batches this large or larger are not resolved
    pub max_missing_fetch: usize,
    pub event_capacity: usize,
    pub flip: FlipConfig,
}

impl Default for WatcherConfig {
    fn default() -> Self {
        Self {
            product_id: None,
            polling_interval: Duration::from_millis(10_000),
            max_missing_fetch: DEFAULT_MAX_MISSING_FETCH,
            event_capacity: DEFAULT_EVENT_CAPACITY,
            flip: FlipConfig::default(),
        }
    }
}

/// Clears the in-flight flag and resets the phase when a cycle ends,
/// including on early return.
struct CycleGuard<'a> {
    in_flight: &'a AtomicBool,
    phase: &'a AtomicU32,
}

impl<'a> CycleGuard<'a> {
    fn acquire(in_flight: &'a AtomicBool, phase: &'a AtomicU32) -> Option<Self> {
        in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self { in_flight, phase })
    }
}

impl Drop for CycleGuard<'_> {
    fn drop(&mut self) {
        self.phase.store(CyclePhase::Idle as u32, Ordering::Release);
        self.in_flight.store(false, Ordering::Release);
    }
}

/// Polls an exchange for open orders and raises events on changes.
///
/// # Architecture
///
/// - `check_orders()` runs one cycle: fetch, diff, resolve, emit
/// - `start()` runs cycles on a fixed interval until the task is aborted
/// - Events go out on a broadcast channel; see `subscribe()`
/// - `flip_order()` places the counter-order for a settled order
pub struct OrderWatcher<C: OrderClient> {
    client: C,
    config: WatcherConfig,
    known: KnownOrders,
    bus: EventBus,
    flipper: FlipEngine,
    phase: AtomicU32,
    in_flight: AtomicBool,
    cycles_completed: AtomicU64,
    cycles_failed: AtomicU64,
    consecutive_failures: AtomicU32,
}

impl<C: OrderClient> OrderWatcher<C> {
    pub fn new(client: C, config: WatcherConfig, rules: Arc<MarketRules>) -> Self {
        let bus = EventBus::new(config.event_capacity);
        let flipper = FlipEngine::new(config.flip, rules);
        Self {
            client,
            config,
            known: KnownOrders::new(),
            bus,
            flipper,
            phase: AtomicU32::new(CyclePhase::Idle as u32),
            in_flight: AtomicBool::new(false),
            cycles_completed: AtomicU64::new(0),
            cycles_failed: AtomicU64::new(0),
            consecutive_failures: AtomicU32::new(0),
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<OrderEvent> {
        self.bus.subscribe()
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    /// Shared handle to the previous snapshot.
    pub fn known_orders(&self) -> &KnownOrders {
        &self.known
    }

    pub fn phase(&self) -> CyclePhase {
        CyclePhase::from_u32(self.phase.load(Ordering::Acquire))
    }

    pub fn is_checking(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    pub fn cycles_completed(&self) -> u64 {
        self.cycles_completed.load(Ordering::Relaxed)
    }

    pub fn cycles_failed(&self) -> u64 {
        self.cycles_failed.load(Ordering::Relaxed)
    }

    pub fn consecutive_failures(&self) -> u32 {
        self.consecutive_failures.load(Ordering::Relaxed)
    }

    fn set_phase(&self, phase: CyclePhase) {
        self.phase.store(phase as u32, Ordering::Release);
    }

    /// Run one reconciliation cycle.
    ///
    /// Returns `CycleOutcome::Skipped` without touching the exchange if a
    /// cycle is already running.
    pub async fn check_orders(&self) -> Result<CycleOutcome, WatchError> {
        let Some(_guard) = CycleGuard::acquire(&self.in_flight, &self.phase) else {
            debug!("Order check already in flight, skipping");
            metrics::record_cycle("skipped");
            return Ok(CycleOutcome::Skipped);
        };

        let started = Instant::now();
        let result = self.run_cycle().await;
        metrics::record_cycle_latency(started.elapsed().as_secs_f64());

        match &result {
            Ok(_) => {
                metrics::record_cycle("completed");
                self.cycles_completed.fetch_add(1, Ordering::Relaxed);
                self.consecutive_failures.store(0, Ordering::Relaxed);
            }
            Err(_) => {
                metrics::record_cycle("failed");
                self.cycles_failed.fetch_add(1, Ordering::Relaxed);
                self.consecutive_failures.fetch_add(1, Ordering::Relaxed);
            }
        }

        result.map(CycleOutcome::Completed)
    }

    async fn run_cycle(&self) -> Result<OrderGroups, WatchError> {
        self.set_phase(CyclePhase::Fetching);
        let query = OrderQuery {
            product_id: self.config.product_id.clone(),
        };
        let incoming = self
            .client
            .list_open_orders(&query)
            .await
            .map_err(WatchError::Fetch)?;

        self.set_phase(CyclePhase::Diffing);
        metrics::set_known_orders(incoming.len());
        let previous = self.known.replace(incoming.clone()).await;
        let groups = group_orders(&previous, &incoming);
        debug!(
            new = groups.new_orders.len(),
            matched = groups.matched_orders.len(),
            missing = groups.missing_orders.len(),
            part_filled = groups.part_filled_orders.len(),
            "Snapshot diffed"
        );

        self.set_phase(CyclePhase::Resolving);
        let groups = resolve_missing(&self.client, groups, self.config.max_missing_fetch)
            .await
            .map_err(WatchError::Resolve)?;

        self.set_phase(CyclePhase::Emitting);
        metrics::record_groups(&groups);
        for event in events_for(&groups) {
            let kind = event.kind();
            let receivers = self.bus.publish(event);
            info!(kind, receivers, "Order event published");
        }

        Ok(groups)
    }

    /// Place the counter-order for a settled order.
    pub async fn flip_order(&self, settled: &Order) -> Result<Option<Order>, FlipError> {
        self.flipper.flip(&self.client, settled).await
    }
}

impl<C: OrderClient + 'static> OrderWatcher<C> {
    /// Start the polling task. The first check runs immediately.
    ///
    /// Returns a `JoinHandle` that can be used to abort the task.
    pub fn start(self: Arc<Self>) -> JoinHandle<()> {
        let period = self.config.polling_interval.max(Duration::from_millis(1));

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            info!(interval_ms = period.as_millis() as u64, "Order watcher started");

            loop {
                ticker.tick().await;
                if let Err(e) = self.check_orders().await {
                    error!(
                        error = %e,
                        consecutive_failures = self.consecutive_failures(),
                        "Order check failed"
                    );
                }
            }
        })
    }
}
