//! Shared cancellation flag with async wake-up.

use parking_lot::RwLock;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::Notify;
use tracing::info;

use crate::errors::GenflowError;

/// A token for cooperative cancellation.
///
/// Pipelines share one token (behind an `Arc`) between the host, the
/// unit-of-work executor and the fan-out runner. Work observes it at
/// suspension points: before each attempt, while an attempt runs, and
/// during backoff sleeps.
///
/// Cancellation is idempotent; only the first reason is kept.
#[derive(Default)]
pub struct CancellationToken {
    cancelled: AtomicBool,
    reason: RwLock<Option<String>>,
    notify: Notify,
}

impl CancellationToken {
    /// Creates a new cancellation token.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests cancellation and wakes every task waiting in
    /// [`cancelled`](Self::cancelled).
    pub fn cancel(&self, reason: impl Into<String>) {
        if self
            .cancelled
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return;
        }
        let reason = reason.into();
        info!(reason = %reason, "Cancellation requested");
        *self.reason.write() = Some(reason);
        self.notify.notify_waiters();
    }

    /// Returns whether cancellation has been requested.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Returns the cancellation reason, if any.
    #[must_use]
    pub fn reason(&self) -> Option<String> {
        self.reason.read().clone()
    }

    /// Completes once cancellation has been requested.
    pub async fn cancelled(&self) {
        loop {
            let notified = self.notify.notified();
            tokio::pin!(notified);
            // Register before checking the flag so a concurrent cancel is not missed.
            notified.as_mut().enable();
            if self.is_cancelled() {
                return;
            }
            notified.await;
        }
    }

    /// Returns a `Cancelled` error if cancellation has been requested.
    ///
    /// # Errors
    ///
    /// Returns [`GenflowError::Cancelled`] carrying the reason.
    pub fn check(&self) -> Result<(), GenflowError> {
        if self.is_cancelled() {
            Err(self.to_error())
        } else {
            Ok(())
        }
    }

    /// Builds the `Cancelled` error for the current reason.
    #[must_use]
    pub fn to_error(&self) -> GenflowError {
        GenflowError::cancelled(self.reason().unwrap_or_else(|| "cancelled".to_string()))
    }
}

impl std::fmt::Debug for CancellationToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CancellationToken")
            .field("cancelled", &self.is_cancelled())
            .field("reason", &self.reason())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    #[test]
    fn test_token_default_not_cancelled() {
        let token = CancellationToken::new();
        assert!(!token.is_cancelled());
        assert!(token.reason().is_none());
        assert!(token.check().is_ok());
    }

    #[test]
    fn test_token_cancel_idempotent() {
        let token = CancellationToken::new();
        token.cancel("First reason");
        token.cancel("Second reason");

        assert!(token.is_cancelled());
        assert_eq!(token.reason(), Some("First reason".to_string()));
    }

    #[test]
    fn test_check_returns_cancelled_error() {
        let token = CancellationToken::new();
        token.cancel("host shutdown");

        let err = token.check().unwrap_err();
        assert!(err.is_cancelled());
        assert_eq!(err.to_string(), "Pipeline cancelled: host shutdown");
    }

    #[tokio::test]
    async fn test_cancelled_wakes_waiter() {
        let token = Arc::new(CancellationToken::new());
        let waiter = {
            let token = token.clone();
            tokio::spawn(async move { token.cancelled().await })
        };

        tokio::time::sleep(Duration::from_millis(10)).await;
        token.cancel("stop");

        tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .expect("waiter should wake")
            .unwrap();
    }

    #[tokio::test]
    async fn test_cancelled_returns_immediately_when_already_cancelled() {
        let token = CancellationToken::new();
        token.cancel("early");
        tokio::time::timeout(Duration::from_millis(50), token.cancelled())
            .await
            .expect("should not block");
    }
}
