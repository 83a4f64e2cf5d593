//! Event emission for pipeline observability.
//!
//! Contexts and executors report transitions (`pipeline.*`, `step.*`) and
//! liveness signals (`unit.*`) to an injected [`EventSink`]. There is no
//! process-global sink; callers that do not care pass [`NoOpEventSink`].

mod sink;

pub use sink::{CollectingEventSink, EventSink, LoggingEventSink, NoOpEventSink, RecordedEvent};

use std::sync::Arc;

/// Returns a shared no-op sink.
#[must_use]
pub fn noop_sink() -> Arc<dyn EventSink> {
    Arc::new(NoOpEventSink)
}
