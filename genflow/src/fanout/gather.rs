//! Structured fan-out and gather over tokio tasks.

use std::future::Future;
use std::sync::Arc;

use futures::future::join_all;
use tokio::task::{JoinError, JoinHandle};
use tracing::{debug, info, warn};

use crate::cancellation::CancellationToken;
use crate::errors::{AggregateFanOutError, BranchFailure, GenflowError};

/// Successful branch results and branch failures, both in index order.
#[derive(Debug)]
pub struct GatherOutcome<T> {
    /// `(index, value)` for every branch that succeeded.
    pub results: Vec<(usize, T)>,
    /// Every branch that failed.
    pub failures: Vec<BranchFailure>,
}

impl<T> Default for GatherOutcome<T> {
    fn default() -> Self {
        Self {
            results: Vec::new(),
            failures: Vec::new(),
        }
    }
}

impl<T> GatherOutcome<T> {
    /// Total number of branches.
    #[must_use]
    pub fn branch_count(&self) -> usize {
        self.results.len() + self.failures.len()
    }

    /// Returns true if no branch failed.
    #[must_use]
    pub fn all_succeeded(&self) -> bool {
        self.failures.is_empty()
    }

    /// Drops indices and returns the successful values in order.
    #[must_use]
    pub fn into_values(self) -> Vec<T> {
        self.results.into_iter().map(|(_, v)| v).collect()
    }
}

/// Aborts every branch still running when the gather is dropped.
struct AbortOnDrop<T>(Vec<JoinHandle<T>>);

impl<T> Drop for AbortOnDrop<T> {
    fn drop(&mut self) {
        for handle in &self.0 {
            handle.abort();
        }
    }
}

/// Runs independent branches concurrently and collects every outcome.
///
/// Every branch is spawned up front and runs to completion on its own; a
/// failing or panicking branch never cancels its siblings. Branches do race
/// the runner's cancellation token.
#[derive(Debug, Clone)]
pub struct FanOutGatherRunner {
    name: String,
    cancel: Arc<CancellationToken>,
}

impl FanOutGatherRunner {
    /// Creates a runner with its own cancellation token.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            cancel: Arc::new(CancellationToken::new()),
        }
    }

    /// Shares a cancellation token with this runner.
    #[must_use]
    pub fn with_cancellation(mut self, token: Arc<CancellationToken>) -> Self {
        self.cancel = token;
        self
    }

    /// Returns the runner name used in logs.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Runs every operation and succeeds if at least one branch succeeded.
    ///
    /// Zero operations yield an empty outcome.
    ///
    /// # Errors
    ///
    /// - [`GenflowError::Cancelled`] if the token fired.
    /// - [`GenflowError::AggregateFanOut`] listing every `(index, error)`
    ///   when no branch succeeded.
    pub async fn gather<T, Fut, I>(&self, operations: I) -> Result<GatherOutcome<T>, GenflowError>
    where
        I: IntoIterator<Item = Fut>,
        Fut: Future<Output = Result<T, GenflowError>> + Send + 'static,
        T: Send + 'static,
    {
        let outcome = self.gather_settled(operations).await;

        if self.cancel.is_cancelled() {
            return Err(self.cancel.to_error());
        }

        if outcome.results.is_empty() && !outcome.failures.is_empty() {
            warn!(
                fanout = %self.name,
                failures = outcome.failures.len(),
                "Every fan-out branch failed"
            );
            return Err(AggregateFanOutError::new(outcome.failures).into());
        }

        Ok(outcome)
    }

    /// Runs every operation and returns the outcome without raising.
    pub async fn gather_settled<T, Fut, I>(&self, operations: I) -> GatherOutcome<T>
    where
        I: IntoIterator<Item = Fut>,
        Fut: Future<Output = Result<T, GenflowError>> + Send + 'static,
        T: Send + 'static,
    {
        let mut branches = AbortOnDrop(
            operations
                .into_iter()
                .map(|operation| {
                    let token = self.cancel.clone();
                    tokio::spawn(async move {
                        tokio::select! {
                            biased;
                            () = token.cancelled() => Err(token.to_error()),
                            result = operation => result,
                        }
                    })
                })
                .collect(),
        );

        debug!(fanout = %self.name, branches = branches.0.len(), "Fan-out started");

        let joined = join_all(branches.0.iter_mut()).await;

        let mut outcome = GatherOutcome::default();
        for (index, joined) in joined.into_iter().enumerate() {
            match joined {
                Ok(Ok(value)) => outcome.results.push((index, value)),
                Ok(Err(error)) => {
                    warn!(fanout = %self.name, index, error = %error, "Fan-out branch failed");
                    outcome.failures.push(BranchFailure::new(index, error));
                }
                Err(join_error) => {
                    let error = join_error_to_genflow(&join_error, &self.cancel);
                    warn!(fanout = %self.name, index, error = %error, "Fan-out branch did not finish");
                    outcome.failures.push(BranchFailure::new(index, error));
                }
            }
        }

        info!(
            fanout = %self.name,
            succeeded = outcome.results.len(),
            failed = outcome.failures.len(),
            "Fan-out gathered"
        );
        outcome
    }
}

fn join_error_to_genflow(join_error: &JoinError, cancel: &CancellationToken) -> GenflowError {
    if join_error.is_panic() {
        GenflowError::Internal(format!("fan-out branch panicked: {join_error}"))
    } else if cancel.is_cancelled() {
        cancel.to_error()
    } else {
        GenflowError::cancelled(format!("fan-out branch aborted: {join_error}"))
    }
}
