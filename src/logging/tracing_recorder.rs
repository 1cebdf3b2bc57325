//! Tracing-based event recorders.
//!
//! `TracingRecorder` emits one structured line per event with the full JSON
//! payload, for log shippers. `SummaryRecorder` emits the short human
//! summaries an operator watches.

use super::recorder::{EventRecorder, RecordError};
use super::summary::{render_changes, render_settled};
use crate::events::OrderEvent;
use async_trait::async_trait;
use tracing::info;

/// Recorder that emits structured tracing logs
#[derive(Debug, Default)]
pub struct TracingRecorder;

impl TracingRecorder {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl EventRecorder for TracingRecorder {
    async fn record(&self, event: &OrderEvent) -> Result<(), RecordError> {
        let payload = serde_json::to_string(event)?;
        info!(
            target: "orders",
            kind = event.kind(),
            payload = %payload,
            "Order event"
        );
        Ok(())
    }
}

/// Recorder that logs the change summary and settlement notice
#[derive(Debug, Default)]
pub struct SummaryRecorder;

impl SummaryRecorder {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl EventRecorder for SummaryRecorder {
    async fn record(&self, event: &OrderEvent) -> Result<(), RecordError> {
        match event {
            OrderEvent::Settled(orders) => {
                let notice = render_settled(orders);
                info!("{} {}", notice.title, notice.message);
            }
            OrderEvent::Changed(groups) => {
                for line in render_changes(groups) {
                    info!("{}", line);
                }
            }
        }
        Ok(())
    }
}
