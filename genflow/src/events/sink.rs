//! Event sink trait and implementations.

use async_trait::async_trait;
use parking_lot::RwLock;
use tracing::{debug, info, warn, Level};

/// A recorded event: its type and optional payload.
pub type RecordedEvent = (String, Option<serde_json::Value>);

/// Receives pipeline transitions and liveness signals.
///
/// Sinks are injected into contexts and executors as `Arc<dyn EventSink>`.
/// Implementations must never fail; delivery problems are theirs to log.
#[async_trait]
pub trait EventSink: Send + Sync {
    /// Delivers `event_type` (e.g. `step.started`) with its payload.
    async fn emit(&self, event_type: &str, data: Option<serde_json::Value>);

    /// Delivers an event from a synchronous context, such as a heartbeat tick.
    fn try_emit(&self, event_type: &str, data: Option<serde_json::Value>);
}

/// A sink that discards all events.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpEventSink;

#[async_trait]
impl EventSink for NoOpEventSink {
    async fn emit(&self, _event_type: &str, _data: Option<serde_json::Value>) {}

    fn try_emit(&self, _event_type: &str, _data: Option<serde_json::Value>) {}
}

/// A sink that forwards events to `tracing`.
///
/// `*.failed` and `*.exhausted` go out at `WARN`, liveness signals
/// (`unit.heartbeat`, `unit.attempt`) at `DEBUG`, everything else at the
/// configured level.
#[derive(Debug, Clone)]
pub struct LoggingEventSink {
    level: Level,
}

impl Default for LoggingEventSink {
    fn default() -> Self {
        Self { level: Level::INFO }
    }
}

impl LoggingEventSink {
    /// Logs lifecycle events at `level`.
    #[must_use]
    pub fn new(level: Level) -> Self {
        Self { level }
    }

    fn level_for(&self, event_type: &str) -> Level {
        if is_failure_event(event_type) {
            Level::WARN
        } else if is_liveness_event(event_type) {
            Level::DEBUG
        } else {
            self.level
        }
    }

    fn log_event(&self, event_type: &str, data: Option<&serde_json::Value>) {
        let data = data.map(ToString::to_string).unwrap_or_default();
        match self.level_for(event_type) {
            Level::ERROR | Level::WARN => warn!(event = event_type, %data, "Pipeline event"),
            Level::INFO => info!(event = event_type, %data, "Pipeline event"),
            _ => debug!(event = event_type, %data, "Pipeline event"),
        }
    }
}

fn is_failure_event(event_type: &str) -> bool {
    event_type.ends_with(".failed") || event_type.ends_with(".exhausted")
}

fn is_liveness_event(event_type: &str) -> bool {
    matches!(event_type, "unit.heartbeat" | "unit.attempt")
}

#[async_trait]
impl EventSink for LoggingEventSink {
    async fn emit(&self, event_type: &str, data: Option<serde_json::Value>) {
        self.log_event(event_type, data.as_ref());
    }

    fn try_emit(&self, event_type: &str, data: Option<serde_json::Value>) {
        self.log_event(event_type, data.as_ref());
    }
}

/// A sink that keeps every event in memory, for tests and status endpoints.
#[derive(Debug, Default)]
pub struct CollectingEventSink {
    events: RwLock<Vec<RecordedEvent>>,
}

impl CollectingEventSink {
    /// Creates a new collecting sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns all collected events.
    #[must_use]
    pub fn events(&self) -> Vec<RecordedEvent> {
        self.events.read().clone()
    }

    /// Returns the collected event types in emission order.
    #[must_use]
    pub fn event_types(&self) -> Vec<String> {
        self.events.read().iter().map(|(t, _)| t.clone()).collect()
    }

    /// Returns the number of collected events.
    #[must_use]
    pub fn len(&self) -> usize {
        self.events.read().len()
    }

    /// Returns true if no events have been collected.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.events.read().is_empty()
    }

    /// Clears all collected events.
    pub fn clear(&self) {
        self.events.write().clear();
    }

    /// Returns events matching a type prefix.
    #[must_use]
    pub fn events_of_type(&self, type_prefix: &str) -> Vec<RecordedEvent> {
        self.events
            .read()
            .iter()
            .filter(|(t, _)| t.starts_with(type_prefix))
            .cloned()
            .collect()
    }

    /// Counts events whose type equals `event_type`.
    #[must_use]
    pub fn count(&self, event_type: &str) -> usize {
        self.events.read().iter().filter(|(t, _)| t == event_type).count()
    }
}

#[async_trait]
impl EventSink for CollectingEventSink {
    async fn emit(&self, event_type: &str, data: Option<serde_json::Value>) {
        self.events.write().push((event_type.to_string(), data));
    }

    fn try_emit(&self, event_type: &str, data: Option<serde_json::Value>) {
        self.events.write().push((event_type.to_string(), data));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_noop_and_logging_sinks_do_not_panic() {
        NoOpEventSink.emit("step.started", None).await;
        let sink = LoggingEventSink::default();
        sink.emit("step.failed", Some(serde_json::json!({"step_id": "face"}))).await;
        LoggingEventSink::new(Level::DEBUG).try_emit("unit.heartbeat", None);
    }

    #[test]
    fn test_event_levels() {
        let sink = LoggingEventSink::default();
        assert_eq!(sink.level_for("step.failed"), Level::WARN);
        assert_eq!(sink.level_for("unit.exhausted"), Level::WARN);
        assert_eq!(sink.level_for("unit.heartbeat"), Level::DEBUG);
        assert_eq!(sink.level_for("step.completed"), Level::INFO);
        assert_eq!(LoggingEventSink::new(Level::DEBUG).level_for("pipeline.started"), Level::DEBUG);
    }

    #[tokio::test]
    async fn test_collecting_sink_records_in_order() {
        let sink = CollectingEventSink::new();
        assert!(sink.is_empty());

        sink.emit("pipeline.started", None).await;
        sink.try_emit("step.started", Some(serde_json::json!({"step_id": "prompts"})));
        sink.emit("step.completed", None).await;

        assert_eq!(sink.len(), 3);
        assert_eq!(
            sink.event_types(),
            vec!["pipeline.started", "step.started", "step.completed"]
        );
        assert_eq!(sink.events_of_type("step.").len(), 2);
        assert_eq!(sink.count("step.started"), 1);

        sink.clear();
        assert!(sink.is_empty());
    }
}
