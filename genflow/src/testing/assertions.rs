//! Assertions over pipeline status and emitted events.

use crate::context::StatusHandle;
use crate::core::PipelineStatus;
use crate::events::CollectingEventSink;

/// Asserts the pipeline reached `expected`.
pub fn assert_pipeline_status(handle: &StatusHandle, expected: PipelineStatus) {
    let actual = handle.status();
    assert_eq!(
        actual, expected,
        "Expected pipeline status {expected}, got {actual} (failure: {:?})",
        handle.failure()
    );
}

/// Asserts exactly `expected` steps completed, in order.
pub fn assert_steps_completed(handle: &StatusHandle, expected: &[&str]) {
    let actual = handle.completed_steps();
    assert_eq!(
        actual, expected,
        "Expected completed steps {expected:?}, got {actual:?}"
    );
}

/// Asserts the pipeline failed at `step_id`.
pub fn assert_failed_at(handle: &StatusHandle, step_id: &str) {
    assert_pipeline_status(handle, PipelineStatus::Failed);
    let failure = handle.failure();
    assert_eq!(
        failure.as_ref().map(|f| f.step_id.as_str()),
        Some(step_id),
        "Expected failure at step '{step_id}', got {failure:?}"
    );
}

/// Asserts `expected` appears in the sink's event types as an ordered
/// subsequence.
pub fn assert_event_order(sink: &CollectingEventSink, expected: &[&str]) {
    let actual = sink.event_types();
    let mut remaining = expected.iter().peekable();
    for event in &actual {
        if remaining.peek().is_some_and(|next| **next == event.as_str()) {
            remaining.next();
        }
    }
    assert!(
        remaining.peek().is_none(),
        "Expected events {expected:?} in order, got {actual:?}"
    );
}
