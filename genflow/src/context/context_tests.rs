//! Lifecycle tests for pipeline contexts.

use std::sync::Arc;
use std::time::Duration;

use pretty_assertions::assert_eq;
use tokio_test::{assert_err, assert_ok};

use crate::auth::AuthGate;
use crate::cancellation::CancellationToken;
use crate::context::{PipelineContext, COMPLETE_STEP_ID};
use crate::core::{PipelineInput, PipelineStatus, StepStatus};
use crate::errors::GenflowError;
use crate::events::CollectingEventSink;

fn open_context() -> (PipelineContext, Arc<CollectingEventSink>) {
    let sink = Arc::new(CollectingEventSink::new());
    let ctx = PipelineContext::new("test", AuthGate::disabled()).with_event_sink(sink.clone());
    (ctx, sink)
}

fn guarded_context() -> PipelineContext {
    PipelineContext::new("test", AuthGate::new(true, Some("s3cret".into())))
}

#[tokio::test]
async fn test_auth_rejection_keeps_pending_and_runs_nothing() {
    let mut ctx = guarded_context();
    let input = PipelineInput::default().with_secret_key("wrong");

    let err = assert_err!(ctx.start(&input).await);
    assert!(matches!(err, GenflowError::Authentication(_)));
    assert_eq!(ctx.status(), PipelineStatus::Pending);
    assert!(ctx.current_step().is_none());

    let step = ctx.step("prompts", "Generating prompts", 0, async { Ok(()) }).await;
    assert!(matches!(step, Err(GenflowError::Validation(_))));
    assert!(ctx.completed_steps().is_empty());
}

#[tokio::test]
async fn test_missing_server_secret_rejects() {
    let mut ctx = PipelineContext::new("test", AuthGate::new(true, None));
    let input = PipelineInput::default().with_secret_key("anything");
    match ctx.start(&input).await {
        Err(GenflowError::Authentication(e)) => {
            assert_eq!(e.to_string(), "Authentication failed: secret key not configured on server");
        }
        other => panic!("expected auth error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_valid_secret_starts() {
    let mut ctx = guarded_context();
    assert_ok!(ctx.start(&PipelineInput::default().with_secret_key("s3cret")).await);
    assert_eq!(ctx.status(), PipelineStatus::Running);
}

#[tokio::test]
async fn test_start_twice_is_validation_error() {
    let (mut ctx, _) = open_context();
    assert_ok!(ctx.start(&PipelineInput::default()).await);
    let err = assert_err!(ctx.start(&PipelineInput::default()).await);
    assert!(matches!(err, GenflowError::Validation(_)));
}

#[tokio::test]
async fn test_steps_record_progress_and_complete() {
    let (mut ctx, sink) = open_context();
    assert_ok!(ctx.start(&PipelineInput::default()).await);

    let face = ctx
        .step("face", "Generating face", 10, async { Ok("face.png") })
        .await;
    assert_eq!(assert_ok!(face), "face.png");

    let current = ctx.current_step().unwrap();
    assert_eq!(current.step_id, "face");
    assert_eq!(current.status, StepStatus::Completed);
    assert_eq!(current.message.as_deref(), Some("Generating face..."));

    assert_ok!(ctx.skip("slowmo", "Slow motion", 60, "slowed_video disabled").await);
    ctx.complete().await;

    assert_eq!(ctx.status(), PipelineStatus::Completed);
    assert_eq!(ctx.completed_steps(), vec!["face".to_string()]);
    assert_eq!(ctx.skipped_steps(), vec!["slowmo".to_string()]);

    let last = ctx.current_step().unwrap();
    assert_eq!(last.step_id, COMPLETE_STEP_ID);
    assert_eq!(last.progress_pct, 100);
    assert_eq!(last.message.as_deref(), Some("Done!"));

    assert_eq!(
        sink.event_types(),
        vec![
            "pipeline.started",
            "step.started",
            "step.completed",
            "step.skipped",
            "pipeline.completed"
        ]
    );
}

#[tokio::test]
async fn test_step_failure_fails_pipeline_and_propagates() {
    let (mut ctx, sink) = open_context();
    assert_ok!(ctx.start(&PipelineInput::default()).await);
    assert_ok!(ctx.step("prompts", "Prompts", 0, async { Ok(()) }).await);

    let result: Result<(), _> = ctx
        .step("video", "Generating video", 30, async {
            Err(GenflowError::transient("provider down"))
        })
        .await;

    let err = assert_err!(result);
    assert!(matches!(err, GenflowError::TransientProvider(ref m) if m == "provider down"));
    assert_eq!(ctx.status(), PipelineStatus::Failed);

    let failure = ctx.failure().unwrap();
    assert_eq!(failure.step_id, "video");
    assert!(failure.message.contains("provider down"));

    let step = ctx.current_step().unwrap();
    assert_eq!(step.status, StepStatus::Failed);
    assert!(step.message.unwrap().contains("provider down"));
    assert_eq!(ctx.completed_steps(), vec!["prompts".to_string()]);
    assert_eq!(sink.count("pipeline.failed"), 1);
}

#[tokio::test]
async fn test_terminal_status_never_changes() {
    let (mut ctx, sink) = open_context();
    assert_ok!(ctx.start(&PipelineInput::default()).await);
    ctx.complete().await;

    ctx.fail("late failure").await;
    ctx.cancel("late cancel").await;
    ctx.complete().await;

    assert_eq!(ctx.status(), PipelineStatus::Completed);
    assert!(ctx.failure().is_none());
    assert_eq!(sink.count("pipeline.completed"), 1);
    assert_eq!(sink.count("pipeline.failed"), 0);

    let step = ctx.step("late", "Late", 100, async { Ok(()) }).await;
    assert!(matches!(step, Err(GenflowError::Validation(_))));
}

#[tokio::test]
async fn test_progress_is_clamped_non_decreasing() {
    let (mut ctx, _) = open_context();
    assert_ok!(ctx.start(&PipelineInput::default()).await);

    assert_ok!(ctx.step("a", "A", 50, async { Ok(()) }).await);
    assert_ok!(ctx.step("b", "B", 20, async { Ok(()) }).await);
    assert_eq!(ctx.current_step().unwrap().progress_pct, 50);

    assert_ok!(ctx.step("c", "C", 250, async { Ok(()) }).await);
    assert_eq!(ctx.current_step().unwrap().progress_pct, 100);
}

#[tokio::test]
async fn test_cancellation_interrupts_running_step() {
    let token = Arc::new(CancellationToken::new());
    let (ctx, sink) = open_context();
    let mut ctx = ctx.with_cancellation(token.clone());
    assert_ok!(ctx.start(&PipelineInput::default()).await);

    let canceller = {
        let token = token.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            token.cancel("user abort");
        })
    };

    let result: Result<(), _> = ctx
        .step("video", "Video", 30, async {
            tokio::time::sleep(Duration::from_secs(30)).await;
            Ok(())
        })
        .await;
    canceller.await.unwrap();

    assert!(matches!(result, Err(GenflowError::Cancelled(ref r)) if r == "user abort"));
    assert_eq!(ctx.status(), PipelineStatus::Cancelled);
    assert!(ctx.failure().is_none());
    assert_eq!(sink.count("pipeline.cancelled"), 1);
}

#[tokio::test]
async fn test_status_handle_reads_concurrently() {
    let (mut ctx, _) = open_context();
    let handle = ctx.status_handle();
    assert_eq!(handle.status(), PipelineStatus::Pending);

    assert_ok!(ctx.start(&PipelineInput::default()).await);

    let observer = handle.clone();
    let observed = ctx
        .step("face", "Face", 10, async move {
            Ok(observer.current_step().map(|s| (s.step_id, s.status)))
        })
        .await;
    assert_eq!(
        assert_ok!(observed),
        Some(("face".to_string(), StepStatus::Running))
    );

    ctx.complete().await;
    let snapshot = handle.snapshot();
    assert_eq!(snapshot.status, PipelineStatus::Completed);
    assert_eq!(snapshot.completed_steps, vec!["face".to_string()]);
    assert_eq!(snapshot.run_id, ctx.run_id());
    assert_eq!(snapshot.to_json()["status"], "completed");
}

#[tokio::test]
async fn test_outputs_bag() {
    let (mut ctx, _) = open_context();
    ctx.set_output("face_url", serde_json::json!("https://cdn/face.png"));
    assert_eq!(
        ctx.output("face_url"),
        Some(&serde_json::json!("https://cdn/face.png"))
    );
    assert!(ctx.output("missing").is_none());
    assert_eq!(ctx.outputs().len(), 1);
}

#[tokio::test]
async fn test_events_carry_run_id() {
    let (mut ctx, sink) = open_context();
    assert_ok!(ctx.start(&PipelineInput::default()).await);
    let (_, data) = &sink.events()[0];
    let data = data.as_ref().unwrap();
    assert_eq!(data["run_id"], ctx.run_id().to_string());
    assert_eq!(data["pipeline"], "test");
}
