//! Pipeline and step status types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// The lifecycle status of a pipeline invocation.
///
/// Transitions are monotonic: once a terminal status is reached it never
/// changes again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineStatus {
    /// Created but not yet authenticated.
    Pending,
    /// Authenticated and executing steps.
    Running,
    /// Every step finished.
    Completed,
    /// A step failed.
    Failed,
    /// Execution was cancelled.
    Cancelled,
}

impl Default for PipelineStatus {
    fn default() -> Self {
        Self::Pending
    }
}

impl fmt::Display for PipelineStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Running => write!(f, "running"),
            Self::Completed => write!(f, "completed"),
            Self::Failed => write!(f, "failed"),
            Self::Cancelled => write!(f, "cancelled"),
        }
    }
}

impl PipelineStatus {
    /// Returns true if the status can no longer change.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Cancelled)
    }
}

/// The status of a single named step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    /// The step body is executing.
    Running,
    /// The step finished (or was skipped).
    Completed,
    /// The step body returned an error.
    Failed,
}

impl fmt::Display for StepStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Running => write!(f, "running"),
            Self::Completed => write!(f, "completed"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

/// Progress record for the current step of a pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepProgress {
    /// Stable step identifier (e.g. "video").
    pub step_id: String,
    /// Human-readable step name.
    pub step_name: String,
    /// Step status.
    pub status: StepStatus,
    /// Overall pipeline progress, 0 to 100.
    pub progress_pct: u8,
    /// Status message shown to observers.
    pub message: Option<String>,
    /// When the step was entered.
    pub started_at: DateTime<Utc>,
    /// True when an optional step was recorded without running.
    #[serde(default)]
    pub skipped: bool,
}

impl StepProgress {
    /// Creates a running step record.
    #[must_use]
    pub fn running(
        step_id: impl Into<String>,
        step_name: impl Into<String>,
        progress_pct: u8,
        message: Option<String>,
    ) -> Self {
        Self {
            step_id: step_id.into(),
            step_name: step_name.into(),
            status: StepStatus::Running,
            progress_pct,
            message,
            started_at: Utc::now(),
            skipped: false,
        }
    }

    /// Converts to a JSON value for event payloads.
    #[must_use]
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!({
            "step_id": self.step_id,
            "step_name": self.step_name,
            "status": self.status.to_string(),
            "progress_pct": self.progress_pct,
            "message": self.message,
            "skipped": self.skipped,
        })
    }
}
