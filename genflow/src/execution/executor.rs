//! Unit-of-work executor: timeout, retry, heartbeat and cancellation.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::time::{Instant, Interval, MissedTickBehavior};
use tracing::{debug, warn};

use super::RetryPolicy;
use crate::cancellation::CancellationToken;
use crate::errors::{GenflowError, TimeoutError};
use crate::events::{EventSink, NoOpEventSink};
use crate::observability::SpanTimer;

/// Identifies one attempt of a unit of work.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Attempt {
    /// 1-based attempt number.
    pub number: u32,
}

impl Attempt {
    /// Returns true for the first attempt.
    #[must_use]
    pub fn is_first(&self) -> bool {
        self.number == 1
    }
}

/// Timeout, retry tier and liveness cadence for one unit of work.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UnitOptions {
    /// Limit for a single attempt.
    pub timeout: Duration,
    /// Retry tier.
    pub retry_policy: RetryPolicy,
    /// Heartbeat cadence during an attempt, if any.
    pub heartbeat: Option<Duration>,
}

impl UnitOptions {
    /// Creates options with the given timeout and policy.
    #[must_use]
    pub fn new(timeout: Duration, retry_policy: RetryPolicy) -> Self {
        Self {
            timeout,
            retry_policy,
            heartbeat: None,
        }
    }

    /// Fast tier with the given timeout.
    #[must_use]
    pub fn fast(timeout: Duration) -> Self {
        Self::new(timeout, RetryPolicy::fast())
    }

    /// Slow tier with the given timeout.
    #[must_use]
    pub fn slow(timeout: Duration) -> Self {
        Self::new(timeout, RetryPolicy::slow())
    }

    /// Long tier with the given timeout.
    #[must_use]
    pub fn long(timeout: Duration) -> Self {
        Self::new(timeout, RetryPolicy::long())
    }

    /// Sets the heartbeat cadence.
    #[must_use]
    pub fn with_heartbeat(mut self, interval: Duration) -> Self {
        self.heartbeat = Some(interval);
        self
    }

    /// Replaces the retry policy.
    #[must_use]
    pub fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.retry_policy = policy;
        self
    }
}

/// Runs fallible operations under a timeout and retry policy.
///
/// Retries are strictly sequential. Each attempt races the shared
/// cancellation token, and so does every backoff sleep.
#[derive(Clone)]
pub struct UnitOfWorkExecutor {
    events: Arc<dyn EventSink>,
    cancel: Arc<CancellationToken>,
}

impl Default for UnitOfWorkExecutor {
    fn default() -> Self {
        Self {
            events: Arc::new(NoOpEventSink),
            cancel: Arc::new(CancellationToken::new()),
        }
    }
}

impl std::fmt::Debug for UnitOfWorkExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UnitOfWorkExecutor")
            .field("cancel", &self.cancel)
            .finish_non_exhaustive()
    }
}

impl UnitOfWorkExecutor {
    /// Creates an executor with a no-op sink and a fresh token.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the sink that receives `unit.*` events.
    #[must_use]
    pub fn with_event_sink(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.events = sink;
        self
    }

    /// Shares a cancellation token with this executor.
    #[must_use]
    pub fn with_cancellation(mut self, token: Arc<CancellationToken>) -> Self {
        self.cancel = token;
        self
    }

    /// Returns the cancellation token observed by this executor.
    #[must_use]
    pub fn cancellation(&self) -> &Arc<CancellationToken> {
        &self.cancel
    }

    /// Runs `operation` until it succeeds, fails terminally, or exhausts its policy.
    ///
    /// # Errors
    ///
    /// - [`GenflowError::Cancelled`] if the token fires before or during an
    ///   attempt, or during a backoff sleep.
    /// - Non-retryable errors from the operation, unchanged, after one attempt.
    /// - [`GenflowError::Timeout`] or the operation's own error after the last
    ///   attempt.
    pub async fn run<T, F, Fut>(
        &self,
        name: &str,
        options: &UnitOptions,
        mut operation: F,
    ) -> Result<T, GenflowError>
    where
        F: FnMut(Attempt) -> Fut,
        Fut: Future<Output = Result<T, GenflowError>>,
    {
        let policy = &options.retry_policy;
        let mut number = 1;

        loop {
            self.cancel.check()?;

            let timer = SpanTimer::start(name);
            let result = self
                .run_attempt(name, number, options, operation(Attempt { number }))
                .await;
            let duration_ms = timer.finish();

            let err = match result {
                Ok(value) => {
                    debug!(unit = name, attempt = number, duration_ms, "Unit of work succeeded");
                    return Ok(value);
                }
                Err(e) => e,
            };

            if err.is_cancelled() {
                return Err(err);
            }

            if !err.is_retryable() {
                warn!(unit = name, attempt = number, error = %err, "Unit of work failed with non-retryable error");
                return Err(err);
            }

            if !policy.allows_retry_after(number) {
                warn!(unit = name, attempts = number, error = %err, "Unit of work exhausted retries");
                self.events
                    .emit(
                        "unit.exhausted",
                        Some(serde_json::json!({
                            "unit": name,
                            "attempts": number,
                            "error_type": err.kind(),
                            "error": err.to_string(),
                        })),
                    )
                    .await;
                return Err(err);
            }

            let delay = policy.delay_for_attempt(number);
            let delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX);
            debug!(unit = name, attempt = number, delay_ms, error = %err, "Retrying unit of work after delay");
            self.events
                .emit(
                    "unit.retry_scheduled",
                    Some(serde_json::json!({
                        "unit": name,
                        "attempt": number,
                        "next_attempt": number + 1,
                        "delay_ms": delay_ms,
                        "error_type": err.kind(),
                        "error": err.to_string(),
                    })),
                )
                .await;

            tokio::select! {
                () = tokio::time::sleep(delay) => {}
                () = self.cancel.cancelled() => return Err(self.cancel.to_error()),
            }

            number += 1;
        }
    }

    async fn run_attempt<T, Fut>(
        &self,
        name: &str,
        number: u32,
        options: &UnitOptions,
        attempt: Fut,
    ) -> Result<T, GenflowError>
    where
        Fut: Future<Output = Result<T, GenflowError>>,
    {
        let attempt = tokio::time::timeout(options.timeout, attempt);
        tokio::pin!(attempt);

        let mut heartbeat = options.heartbeat.map(|period| {
            let mut interval = tokio::time::interval_at(Instant::now() + period, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
            interval
        });
        let mut beats: u64 = 0;

        loop {
            tokio::select! {
                biased;
                () = self.cancel.cancelled() => return Err(self.cancel.to_error()),
                outcome = &mut attempt => {
                    return match outcome {
                        Ok(result) => result,
                        Err(_) => Err(TimeoutError::new(name, options.timeout).into()),
                    };
                }
                () = next_beat(&mut heartbeat) => {
                    beats += 1;
                    debug!(unit = name, attempt = number, beats, "Heartbeat");
                    self.events.try_emit(
                        "unit.heartbeat",
                        Some(serde_json::json!({
                            "unit": name,
                            "attempt": number,
                            "beats": beats,
                        })),
                    );
                }
            }
        }
    }
}

async fn next_beat(heartbeat: &mut Option<Interval>) {
    match heartbeat {
        Some(interval) => {
            interval.tick().await;
        }
        None => std::future::pending::<()>().await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::CollectingEventSink;
    use std::sync::atomic::{AtomicU32, Ordering};
    use tokio_test::{assert_err, assert_ok};

    fn executor_with_sink() -> (UnitOfWorkExecutor, Arc<CollectingEventSink>) {
        let sink = Arc::new(CollectingEventSink::new());
        (UnitOfWorkExecutor::new().with_event_sink(sink.clone()), sink)
    }

    #[tokio::test(start_paused = true)]
    async fn test_success_on_first_attempt() {
        let (executor, sink) = executor_with_sink();
        let value = executor
            .run("quick", &UnitOptions::fast(Duration::from_secs(5)), |attempt| async move {
                assert!(attempt.is_first());
                Ok::<_, GenflowError>(42)
            })
            .await;
        assert_eq!(assert_ok!(value), 42);
        assert!(sink.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_transient_errors_retried_with_backoff() {
        let (executor, sink) = executor_with_sink();
        let calls = Arc::new(AtomicU32::new(0));
        let started = Instant::now();

        let c = calls.clone();
        let value = executor
            .run("flaky", &UnitOptions::fast(Duration::from_secs(5)), move |attempt| {
                let c = c.clone();
                async move {
                    c.fetch_add(1, Ordering::SeqCst);
                    if attempt.number < 3 {
                        Err(GenflowError::transient("503 unavailable"))
                    } else {
                        Ok(attempt.number)
                    }
                }
            })
            .await;

        assert_eq!(assert_ok!(value), 3);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        // 1s after attempt 1, 2s after attempt 2
        let waited = started.elapsed();
        assert!(waited >= Duration::from_secs(3) && waited < Duration::from_secs(4));
        assert_eq!(sink.count("unit.retry_scheduled"), 2);
        let events = sink.events_of_type("unit.retry_scheduled");
        assert_eq!(events[1].1.as_ref().unwrap()["delay_ms"], 2000);
    }

    #[tokio::test(start_paused = true)]
    async fn test_exhaustion_returns_operation_error() {
        let (executor, sink) = executor_with_sink();
        let calls = Arc::new(AtomicU32::new(0));

        let c = calls.clone();
        let result: Result<(), _> = executor
            .run("always_fails", &UnitOptions::slow(Duration::from_secs(5)), move |_| {
                let c = c.clone();
                async move {
                    c.fetch_add(1, Ordering::SeqCst);
                    Err(GenflowError::transient("overloaded"))
                }
            })
            .await;

        let err = assert_err!(result);
        assert!(matches!(err, GenflowError::TransientProvider(ref m) if m == "overloaded"));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert_eq!(sink.count("unit.exhausted"), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_non_retryable_error_propagates_immediately() {
        let executor = UnitOfWorkExecutor::new();
        let calls = Arc::new(AtomicU32::new(0));

        let c = calls.clone();
        let result: Result<(), _> = executor
            .run("bad_input", &UnitOptions::fast(Duration::from_secs(5)), move |_| {
                let c = c.clone();
                async move {
                    c.fetch_add(1, Ordering::SeqCst);
                    Err(GenflowError::validation("prompt is empty"))
                }
            })
            .await;

        assert!(matches!(result, Err(GenflowError::Validation(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_attempt_timeout_is_retried_then_reported() {
        let executor = UnitOfWorkExecutor::new();
        let options = UnitOptions::fast(Duration::from_secs(2)).with_retry_policy(
            RetryPolicy::fast().with_max_attempts(2),
        );

        let result: Result<(), _> = executor
            .run("hangs", &options, |_| async {
                tokio::time::sleep(Duration::from_secs(60)).await;
                Ok(())
            })
            .await;

        match result {
            Err(GenflowError::Timeout(t)) => {
                assert_eq!(t.operation, "hangs");
                assert_eq!(t.timeout, Duration::from_secs(2));
            }
            other => panic!("expected timeout, got {other:?}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_heartbeat_emitted_during_long_attempt() {
        let (executor, sink) = executor_with_sink();
        let options =
            UnitOptions::slow(Duration::from_secs(60)).with_heartbeat(Duration::from_secs(10));

        let value = executor
            .run("render", &options, |_| async {
                tokio::time::sleep(Duration::from_secs(35)).await;
                Ok::<_, GenflowError>("done")
            })
            .await;

        assert_eq!(assert_ok!(value), "done");
        assert_eq!(sink.count("unit.heartbeat"), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_heartbeat_does_not_extend_timeout() {
        let executor = UnitOfWorkExecutor::new();
        let options = UnitOptions::new(Duration::from_secs(15), RetryPolicy::no_retry())
            .with_heartbeat(Duration::from_secs(5));

        let result: Result<(), _> = executor
            .run("render", &options, |_| async {
                tokio::time::sleep(Duration::from_secs(30)).await;
                Ok(())
            })
            .await;

        assert!(matches!(result, Err(GenflowError::Timeout(_))));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_during_backoff_stops_retries() {
        let token = Arc::new(CancellationToken::new());
        let executor = UnitOfWorkExecutor::new().with_cancellation(token.clone());
        let calls = Arc::new(AtomicU32::new(0));

        let canceller = {
            let token = token.clone();
            tokio::spawn(async move {
                tokio::time::sleep(Duration::from_millis(500)).await;
                token.cancel("host shutdown");
            })
        };

        let c = calls.clone();
        let result: Result<(), _> = executor
            .run("flaky", &UnitOptions::fast(Duration::from_secs(5)), move |_| {
                let c = c.clone();
                async move {
                    c.fetch_add(1, Ordering::SeqCst);
                    Err(GenflowError::transient("rate limit"))
                }
            })
            .await;

        canceller.await.unwrap();
        assert!(matches!(result, Err(GenflowError::Cancelled(ref r)) if r == "host shutdown"));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_already_cancelled_never_runs_operation() {
        let token = Arc::new(CancellationToken::new());
        token.cancel("stop");
        let executor = UnitOfWorkExecutor::new().with_cancellation(token);
        let calls = Arc::new(AtomicU32::new(0));

        let c = calls.clone();
        let result: Result<(), _> = executor
            .run("never", &UnitOptions::fast(Duration::from_secs(1)), move |_| {
                c.fetch_add(1, Ordering::SeqCst);
                async { Ok(()) }
            })
            .await;
        assert!(matches!(result, Err(GenflowError::Cancelled(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }
}
