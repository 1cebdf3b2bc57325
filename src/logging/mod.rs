//! Logging and Event Recording Module
//!
//! - `init_tracing` - subscriber setup for the binary
//! - `EventRecorder` trait - pluggable recorder interface
//! - `TracingRecorder` - structured JSON payload per event
//! - `SummaryRecorder` - operator-facing change summaries

pub mod recorder;
pub mod summary;
pub mod tracing_recorder;

pub use recorder::{EventRecorder, MultiRecorder, RecordError};
pub use summary::{render_changes, render_settled, SettledNotice};
pub use tracing_recorder::{SummaryRecorder, TracingRecorder};

/// Install the global fmt subscriber. `RUST_LOG` wins over `default_level`.
pub fn init_tracing(default_level: &str) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));

    // A second init (tests, embedding) is not an error worth surfacing.
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}
