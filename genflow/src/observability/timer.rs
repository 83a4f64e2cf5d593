//! Span timing for steps and attempts.

use std::time::Duration;

use tokio::time::Instant;

/// Measures a step or attempt on the tokio clock, so paused-time tests
/// see virtual durations.
#[derive(Debug)]
pub struct SpanTimer {
    start: Instant,
    name: String,
}

impl SpanTimer {
    /// Starts a new span timer.
    #[must_use]
    pub fn start(name: impl Into<String>) -> Self {
        Self {
            start: Instant::now(),
            name: name.into(),
        }
    }

    /// Returns the elapsed time.
    #[must_use]
    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }

    /// Returns the elapsed time in whole milliseconds.
    #[must_use]
    pub fn elapsed_ms(&self) -> u64 {
        u64::try_from(self.start.elapsed().as_millis()).unwrap_or(u64::MAX)
    }

    /// Returns the span name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Finishes the span, logs it at debug level and returns the duration in milliseconds.
    pub fn finish(self) -> u64 {
        let duration_ms = self.elapsed_ms();
        tracing::debug!(span = %self.name, duration_ms, "Span finished");
        duration_ms
    }
}
