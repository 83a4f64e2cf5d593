//! Read-only status views shared with observers.

use std::sync::Arc;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::core::{PipelineStatus, StepProgress};

/// The step that failed a pipeline and why.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepFailure {
    /// Id of the failing step, or "pipeline" for host-driven failures.
    pub step_id: String,
    /// Error text.
    pub message: String,
}

/// Point-in-time copy of a pipeline's progress.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusSnapshot {
    /// Invocation id.
    pub run_id: Uuid,
    /// Pipeline name.
    pub pipeline: String,
    /// Lifecycle status.
    pub status: PipelineStatus,
    /// Most recent step record.
    pub current_step: Option<StepProgress>,
    /// Ids of steps that ran to completion, in order.
    pub completed_steps: Vec<String>,
    /// Ids of optional steps that were skipped, in order.
    pub skipped_steps: Vec<String>,
    /// Set once the pipeline fails.
    pub failure: Option<StepFailure>,
}

impl StatusSnapshot {
    pub(crate) fn new(run_id: Uuid, pipeline: String) -> Self {
        Self {
            run_id,
            pipeline,
            status: PipelineStatus::Pending,
            current_step: None,
            completed_steps: Vec::new(),
            skipped_steps: Vec::new(),
            failure: None,
        }
    }

    /// Converts to a JSON value.
    #[must_use]
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_default()
    }
}

/// Cloneable read-only view of a running pipeline.
///
/// Safe to query from any task while the owning pipeline keeps writing.
#[derive(Debug, Clone)]
pub struct StatusHandle {
    state: Arc<RwLock<StatusSnapshot>>,
}

impl StatusHandle {
    pub(crate) fn new(state: Arc<RwLock<StatusSnapshot>>) -> Self {
        Self { state }
    }

    /// Returns the lifecycle status.
    #[must_use]
    pub fn status(&self) -> PipelineStatus {
        self.state.read().status
    }

    /// Returns the most recent step record.
    #[must_use]
    pub fn current_step(&self) -> Option<StepProgress> {
        self.state.read().current_step.clone()
    }

    /// Returns the ids of completed steps.
    #[must_use]
    pub fn completed_steps(&self) -> Vec<String> {
        self.state.read().completed_steps.clone()
    }

    /// Returns the failure record, if any.
    #[must_use]
    pub fn failure(&self) -> Option<StepFailure> {
        self.state.read().failure.clone()
    }

    /// Returns a full copy of the current state.
    #[must_use]
    pub fn snapshot(&self) -> StatusSnapshot {
        self.state.read().clone()
    }
}
