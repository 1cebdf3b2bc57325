//! Event Recording System
//!
//! Provides a pluggable `EventRecorder` trait for recording order events to
//! various backends. The watch command runs one recorder per subscription.

use async_trait::async_trait;
use thiserror::Error;

use crate::events::OrderEvent;

/// Error type for event recording operations
#[derive(Debug, Error)]
pub enum RecordError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Trait for recording order events to various backends
#[async_trait]
pub trait EventRecorder: Send + Sync {
    /// Record an event. Implementations should be non-blocking.
    async fn record(&self, event: &OrderEvent) -> Result<(), RecordError>;

    /// Flush any buffered records (optional, default no-op)
    async fn flush(&self) -> Result<(), RecordError> {
        Ok(())
    }
}

/// A recorder that fans out to multiple backends
pub struct MultiRecorder {
    recorders: Vec<Box<dyn EventRecorder>>,
}

impl MultiRecorder {
    pub fn new(recorders: Vec<Box<dyn EventRecorder>>) -> Self {
        Self { recorders }
    }
}

#[async_trait]
impl EventRecorder for MultiRecorder {
    async fn record(&self, event: &OrderEvent) -> Result<(), RecordError> {
        let mut error_count = 0;
        let mut last_error = None;

        for recorder in &self.recorders {
            if let Err(e) = recorder.record(event).await {
                // Best-effort: one failing backend must not starve the rest
                tracing::error!(error = %e, "Failed to record order event to backend");
                last_error = Some(e);
                error_count += 1;
            }
        }

        if error_count > 0 && error_count == self.recorders.len() {
            if let Some(e) = last_error {
                return Err(e);
            }
        }

        Ok(())
    }

    async fn flush(&self) -> Result<(), RecordError> {
        for recorder in &self.recorders {
            recorder.flush().await?;
        }
        Ok(())
    }
}
