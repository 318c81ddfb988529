//! Structured progress reporting for ingestion runs.
//!
//! Provides observable, incremental feedback while a corpus is embedded and
//! written, which can take hours for a full dataset split.

use std::sync::Arc;
use std::time::Instant;

/// Progress event emitted during ingestion.
#[derive(Debug, Clone)]
pub struct ProgressEvent {
    /// Phase of the operation: "rebuild", "embed", "flush", "done"
    pub phase: String,

    /// Documents processed so far
    pub current: u64,

    /// Human-readable message
    pub message: String,

    /// Elapsed time since the reporter was created
    pub elapsed_secs: Option<f64>,
}

impl ProgressEvent {
    pub fn new(phase: impl Into<String>, current: u64, message: impl Into<String>) -> Self {
        Self {
            phase: phase.into(),
            current,
            message: message.into(),
            elapsed_secs: None,
        }
    }

    pub fn with_elapsed(mut self, elapsed_secs: f64) -> Self {
        self.elapsed_secs = Some(elapsed_secs);
        self
    }

    /// Format as a simple user-facing line.
    pub fn format_simple(&self) -> String {
        let rate = match self.elapsed_secs {
            Some(secs) if secs > 0.0 && self.current > 0 => {
                format!(" [{:.1} docs/s]", self.current as f64 / secs)
            }
            _ => String::new(),
        };

        format!(
            "[{}] {} - {}{}",
            self.phase, self.current, self.message, rate
        )
    }
}

/// Callback for progress events.
pub type ProgressCallback = Arc<dyn Fn(ProgressEvent) + Send + Sync>;

/// Progress reporter that emits events through a callback.
#[derive(Clone)]
pub struct ProgressReporter {
    callback: Option<ProgressCallback>,
    start_time: Arc<Instant>,
}

impl std::fmt::Debug for ProgressReporter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProgressReporter")
            .field("enabled", &self.callback.is_some())
            .finish()
    }
}

impl ProgressReporter {
    pub fn new(callback: ProgressCallback) -> Self {
        Self {
            callback: Some(callback),
            start_time: Arc::new(Instant::now()),
        }
    }

    /// Create a no-op reporter (no events emitted).
    pub fn noop() -> Self {
        Self {
            callback: None,
            start_time: Arc::new(Instant::now()),
        }
    }

    pub fn emit(&self, event: ProgressEvent) {
        if let Some(callback) = &self.callback {
            let elapsed = self.start_time.elapsed().as_secs_f64();
            let event = event.with_elapsed(elapsed);

            tracing::trace!(
                phase = %event.phase,
                current = event.current,
                message = %event.message,
                elapsed_secs = elapsed,
                "Progress event"
            );

            callback(event);
        }
    }

    /// The target index was dropped and recreated.
    pub fn rebuild(&self, index: &str, dimensions: usize) {
        self.emit(ProgressEvent::new(
            "rebuild",
            0,
            format!("index '{}' recreated ({} dims)", index, dimensions),
        ));
    }

    pub fn embed(&self, processed: u64, model: &str) {
        self.emit(ProgressEvent::new(
            "embed",
            processed,
            format!("model={}", model),
        ));
    }

    /// A bulk write completed.
    pub fn flush(&self, indexed: u64, batch: u64, batch_size: usize) {
        self.emit(ProgressEvent::new(
            "flush",
            indexed,
            format!("batch {} ({} documents)", batch, batch_size),
        ));
    }

    pub fn done(&self, indexed: u64, skipped: u64, failed: u64) {
        self.emit(ProgressEvent::new(
            "done",
            indexed,
            format!("{} skipped, {} failed", skipped, failed),
        ));
    }
}
