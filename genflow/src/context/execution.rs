//! The owning, mutable side of a pipeline invocation.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use parking_lot::RwLock;
use serde_json::json;
use tracing::{info, warn};
use uuid::Uuid;

use super::{StatusHandle, StatusSnapshot, StepFailure};
use crate::auth::AuthGate;
use crate::cancellation::CancellationToken;
use crate::core::{PipelineInput, PipelineStatus, StepProgress, StepStatus};
use crate::errors::GenflowError;
use crate::events::{noop_sink, EventSink};
use crate::observability::SpanTimer;

/// Step id used for the synthetic terminal step.
pub const COMPLETE_STEP_ID: &str = "complete";

/// Tracks status and step progress for one pipeline invocation.
///
/// Only the owner (through `&mut self`) writes; observers read through a
/// [`StatusHandle`].
pub struct PipelineContext {
    run_id: Uuid,
    pipeline: String,
    auth: AuthGate,
    state: Arc<RwLock<StatusSnapshot>>,
    outputs: HashMap<String, serde_json::Value>,
    events: Arc<dyn EventSink>,
    cancel: Arc<CancellationToken>,
    last_pct: u8,
}

impl std::fmt::Debug for PipelineContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PipelineContext")
            .field("run_id", &self.run_id)
            .field("pipeline", &self.pipeline)
            .field("status", &self.status())
            .finish_non_exhaustive()
    }
}

impl PipelineContext {
    /// Creates a pending context guarded by `auth`.
    #[must_use]
    pub fn new(pipeline: impl Into<String>, auth: AuthGate) -> Self {
        let run_id = Uuid::new_v4();
        let pipeline = pipeline.into();
        Self {
            run_id,
            state: Arc::new(RwLock::new(StatusSnapshot::new(run_id, pipeline.clone()))),
            pipeline,
            auth,
            outputs: HashMap::new(),
            events: noop_sink(),
            cancel: Arc::new(CancellationToken::new()),
            last_pct: 0,
        }
    }

    /// Sets the event sink.
    #[must_use]
    pub fn with_event_sink(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.events = sink;
        self
    }

    /// Shares a cancellation token with this context.
    #[must_use]
    pub fn with_cancellation(mut self, token: Arc<CancellationToken>) -> Self {
        self.cancel = token;
        self
    }

    /// Returns the invocation id.
    #[must_use]
    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    /// Returns the pipeline name.
    #[must_use]
    pub fn pipeline(&self) -> &str {
        &self.pipeline
    }

    /// Returns the cancellation token.
    #[must_use]
    pub fn cancellation(&self) -> &Arc<CancellationToken> {
        &self.cancel
    }

    /// Returns a read-only handle for concurrent observers.
    #[must_use]
    pub fn status_handle(&self) -> StatusHandle {
        StatusHandle::new(self.state.clone())
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

    /// Returns the ids of steps that ran to completion.
    #[must_use]
    pub fn completed_steps(&self) -> Vec<String> {
        self.state.read().completed_steps.clone()
    }

    /// Returns the ids of skipped optional steps.
    #[must_use]
    pub fn skipped_steps(&self) -> Vec<String> {
        self.state.read().skipped_steps.clone()
    }

    /// Returns the failure record, if any.
    #[must_use]
    pub fn failure(&self) -> Option<StepFailure> {
        self.state.read().failure.clone()
    }

    /// Stores a step output.
    pub fn set_output(&mut self, key: impl Into<String>, value: serde_json::Value) {
        self.outputs.insert(key.into(), value);
    }

    /// Returns a step output.
    #[must_use]
    pub fn output(&self, key: &str) -> Option<&serde_json::Value> {
        self.outputs.get(key)
    }

    /// Returns every stored output.
    #[must_use]
    pub fn outputs(&self) -> &HashMap<String, serde_json::Value> {
        &self.outputs
    }

    /// Authenticates `input` and moves the context to `Running`.
    ///
    /// # Errors
    ///
    /// - [`GenflowError::Validation`] if the context is not pending.
    /// - [`GenflowError::Authentication`] if the gate rejects the input; the
    ///   status stays `Pending`.
    pub async fn start(&mut self, input: &PipelineInput) -> Result<(), GenflowError> {
        let status = self.status();
        if status != PipelineStatus::Pending {
            return Err(GenflowError::validation(format!(
                "pipeline '{}' already started (status: {status})",
                self.pipeline
            )));
        }

        self.auth.check(input)?;

        self.state.write().status = PipelineStatus::Running;
        info!(pipeline = %self.pipeline, run_id = %self.run_id, "Pipeline started");
        self.emit("pipeline.started", json!({})).await;
        Ok(())
    }

    /// Runs `body` as the step `id`, using `"{name}..."` as the message.
    ///
    /// # Errors
    ///
    /// See [`step_with_message`](Self::step_with_message).
    pub async fn step<T, Fut>(
        &mut self,
        id: &str,
        name: &str,
        progress_pct: u8,
        body: Fut,
    ) -> Result<T, GenflowError>
    where
        Fut: Future<Output = Result<T, GenflowError>>,
    {
        let message = format!("{name}...");
        self.step_with_message(id, name, progress_pct, message, body)
            .await
    }

    /// Runs `body` as the step `id` with a custom running message.
    ///
    /// On success the step is marked completed. On error the step and the
    /// pipeline are marked failed (or cancelled) and the error is returned
    /// unchanged. The body races the context's cancellation token.
    ///
    /// # Errors
    ///
    /// - [`GenflowError::Validation`] if the pipeline is not running.
    /// - Whatever `body` returns.
    pub async fn step_with_message<T, Fut>(
        &mut self,
        id: &str,
        name: &str,
        progress_pct: u8,
        message: impl Into<String>,
        body: Fut,
    ) -> Result<T, GenflowError>
    where
        Fut: Future<Output = Result<T, GenflowError>>,
    {
        self.ensure_running(id)?;

        let pct = self.clamp_pct(id, progress_pct);
        let progress = StepProgress::running(id, name, pct, Some(message.into()));
        self.emit("step.started", progress.to_json()).await;
        self.state.write().current_step = Some(progress);
        info!(pipeline = %self.pipeline, step_id = id, progress_pct = pct, "Step started");

        let timer = SpanTimer::start(format!("{}.{id}", self.pipeline));
        let cancel = self.cancel.clone();
        let result = tokio::select! {
            biased;
            () = cancel.cancelled() => Err(cancel.to_error()),
            result = body => result,
        };
        let duration_ms = timer.finish();

        match result {
            Ok(value) => {
                {
                    let mut state = self.state.write();
                    if let Some(step) = state.current_step.as_mut() {
                        step.status = StepStatus::Completed;
                    }
                    state.completed_steps.push(id.to_string());
                }
                info!(pipeline = %self.pipeline, step_id = id, duration_ms, "Step completed");
                self.emit(
                    "step.completed",
                    json!({"step_id": id, "duration_ms": duration_ms}),
                )
                .await;
                Ok(value)
            }
            Err(error) => {
                {
                    let mut state = self.state.write();
                    if let Some(step) = state.current_step.as_mut() {
                        step.status = StepStatus::Failed;
                        step.message = Some(error.to_string());
                    }
                }
                warn!(pipeline = %self.pipeline, step_id = id, error = %error, "Step failed");
                self.emit(
                    "step.failed",
                    json!({"step_id": id, "error": error.to_string(), "kind": error.kind()}),
                )
                .await;

                if error.is_cancelled() {
                    self.finish_cancelled(&error.to_string()).await;
                } else {
                    self.finish_failed(id, &error.to_string()).await;
                }
                Err(error)
            }
        }
    }

    /// Records an optional step that did not run.
    ///
    /// The step shows as completed with `skipped = true` and is listed in
    /// [`skipped_steps`](Self::skipped_steps), not `completed_steps`.
    ///
    /// # Errors
    ///
    /// Returns [`GenflowError::Validation`] if the pipeline is not running.
    pub async fn skip(
        &mut self,
        id: &str,
        name: &str,
        progress_pct: u8,
        reason: &str,
    ) -> Result<(), GenflowError> {
        self.ensure_running(id)?;

        let pct = self.clamp_pct(id, progress_pct);
        let mut progress = StepProgress::running(id, name, pct, Some(reason.to_string()));
        progress.status = StepStatus::Completed;
        progress.skipped = true;

        {
            let mut state = self.state.write();
            state.current_step = Some(progress);
            state.skipped_steps.push(id.to_string());
        }
        info!(pipeline = %self.pipeline, step_id = id, reason, "Step skipped");
        self.emit("step.skipped", json!({"step_id": id, "reason": reason}))
            .await;
        Ok(())
    }

    /// Marks the pipeline completed with a synthetic "complete" step.
    ///
    /// Ignored once terminal.
    pub async fn complete(&mut self) {
        {
            let mut state = self.state.write();
            if state.status.is_terminal() {
                return;
            }
            let mut progress =
                StepProgress::running(COMPLETE_STEP_ID, "Complete", 100, Some("Done!".into()));
            progress.status = StepStatus::Completed;
            state.current_step = Some(progress);
            state.status = PipelineStatus::Completed;
        }
        self.last_pct = 100;
        info!(pipeline = %self.pipeline, run_id = %self.run_id, "Pipeline completed");
        self.emit("pipeline.completed", json!({})).await;
    }

    /// Fails the pipeline from outside a step. Ignored once terminal.
    pub async fn fail(&mut self, message: &str) {
        let step_id = self
            .current_step()
            .map_or_else(|| "pipeline".to_string(), |s| s.step_id);
        self.finish_failed(&step_id, message).await;
    }

    /// Cancels the pipeline and its token. Ignored once terminal.
    pub async fn cancel(&mut self, reason: &str) {
        if self.status().is_terminal() {
            return;
        }
        self.cancel.cancel(reason);
        self.finish_cancelled(reason).await;
    }

    fn ensure_running(&self, id: &str) -> Result<(), GenflowError> {
        let status = self.status();
        if status == PipelineStatus::Running {
            return Ok(());
        }
        if status == PipelineStatus::Cancelled {
            return Err(self.cancel.to_error());
        }
        Err(GenflowError::validation(format!(
            "cannot run step '{id}': pipeline '{}' is {status}",
            self.pipeline
        )))
    }

    fn clamp_pct(&mut self, id: &str, requested: u8) -> u8 {
        let mut pct = requested.min(100);
        if pct < self.last_pct {
            warn!(
                pipeline = %self.pipeline,
                step_id = id,
                requested,
                previous = self.last_pct,
                "Progress went backwards; clamping"
            );
            pct = self.last_pct;
        } else if pct != requested {
            warn!(pipeline = %self.pipeline, step_id = id, requested, "Progress above 100; clamping");
        }
        self.last_pct = pct;
        pct
    }

    async fn finish_failed(&mut self, step_id: &str, message: &str) {
        {
            let mut state = self.state.write();
            if state.status.is_terminal() {
                return;
            }
            state.status = PipelineStatus::Failed;
            state.failure = Some(StepFailure {
                step_id: step_id.to_string(),
                message: message.to_string(),
            });
        }
        warn!(pipeline = %self.pipeline, run_id = %self.run_id, step_id, error = message, "Pipeline failed");
        self.emit(
            "pipeline.failed",
            json!({"step_id": step_id, "error": message}),
        )
        .await;
    }

    async fn finish_cancelled(&mut self, reason: &str) {
        {
            let mut state = self.state.write();
            if state.status.is_terminal() {
                return;
            }
            state.status = PipelineStatus::Cancelled;
        }
        info!(pipeline = %self.pipeline, run_id = %self.run_id, reason, "Pipeline cancelled");
        self.emit("pipeline.cancelled", json!({"reason": reason}))
            .await;
    }

    async fn emit(&self, event_type: &str, mut data: serde_json::Value) {
        if let Some(map) = data.as_object_mut() {
            map.insert("run_id".into(), json!(self.run_id.to_string()));
            map.insert("pipeline".into(), json!(self.pipeline));
        }
        self.events.emit(event_type, Some(data)).await;
    }
}
