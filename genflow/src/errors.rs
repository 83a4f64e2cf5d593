//! Error types for the genflow orchestration core.
//!
//! Every fallible operation in the crate returns [`GenflowError`]. The
//! variants follow the pipeline's failure taxonomy: authentication and
//! validation failures are terminal, provider and timeout failures may be
//! retried, and aggregate failures summarize a whole fan-out.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// The main error type for genflow operations.
#[derive(Debug, Clone, Error)]
pub enum GenflowError {
    /// The caller failed the shared-secret check.
    #[error("{0}")]
    Authentication(#[from] AuthenticationError),

    /// Input was malformed.
    #[error("Validation error: {0}")]
    Validation(String),

    /// A provider failed in a way known to be worth retrying.
    #[error("Transient provider error: {0}")]
    TransientProvider(String),

    /// A provider returned an error.
    #[error("{0}")]
    Provider(#[from] ProviderError),

    /// A single attempt exceeded its timeout.
    #[error("{0}")]
    Timeout(#[from] TimeoutError),

    /// Every branch of a fan-out failed.
    #[error("{0}")]
    AggregateFanOut(#[from] AggregateFanOutError),

    /// Both the primary and the fallback configuration failed.
    #[error("{0}")]
    FallbackExhausted(#[from] FallbackExhaustedError),

    /// Execution was cancelled cooperatively.
    #[error("Pipeline cancelled: {0}")]
    Cancelled(String),

    /// Configuration is missing or inconsistent.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// IO error.
    #[error("IO error: {0}")]
    Io(String),

    /// A bug surfaced at runtime, such as a panicking fan-out branch.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl GenflowError {
    /// Creates a validation error.
    #[must_use]
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Creates a transient provider error.
    #[must_use]
    pub fn transient(message: impl Into<String>) -> Self {
        Self::TransientProvider(message.into())
    }

    /// Creates a cancellation error.
    #[must_use]
    pub fn cancelled(reason: impl Into<String>) -> Self {
        Self::Cancelled(reason.into())
    }

    /// Creates a configuration error.
    #[must_use]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Returns the type name of the error.
    ///
    /// Provider errors report the upstream type name so that classification
    /// can match on heterogeneous provider hierarchies.
    #[must_use]
    pub fn kind(&self) -> &str {
        match self {
            Self::Authentication(_) => "AuthenticationError",
            Self::Validation(_) => "ValidationError",
            Self::TransientProvider(_) => "TransientProviderError",
            Self::Provider(e) => &e.error_type,
            Self::Timeout(_) => "TimeoutError",
            Self::AggregateFanOut(_) => "AggregateFanOutError",
            Self::FallbackExhausted(_) => "FallbackExhaustedError",
            Self::Cancelled(_) => "CancelledError",
            Self::Config(_) => "ConfigError",
            Self::Serialization(_) => "SerializationError",
            Self::Io(_) => "IoError",
            Self::Internal(_) => "InternalError",
        }
    }

    /// Returns true if a retry policy may attempt the operation again.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        !matches!(
            self,
            Self::Authentication(_)
                | Self::Validation(_)
                | Self::AggregateFanOut(_)
                | Self::Cancelled(_)
                | Self::Config(_)
                | Self::Serialization(_)
                | Self::Internal(_)
        )
    }

    /// Returns true if this error represents a cancellation.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled(_))
    }
}

impl From<std::io::Error> for GenflowError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

impl From<serde_json::Error> for GenflowError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

/// Why authentication was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthFailure {
    /// Auth is required but the server has no secret configured.
    SecretNotConfigured,
    /// The submitted secret is missing or does not match.
    InvalidSecret,
}

impl fmt::Display for AuthFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SecretNotConfigured => write!(f, "secret key not configured on server"),
            Self::InvalidSecret => write!(f, "invalid secret_key"),
        }
    }
}

/// Error raised when the shared-secret check fails.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Authentication failed: {reason}")]
pub struct AuthenticationError {
    /// The failure reason.
    pub reason: AuthFailure,
}

impl AuthenticationError {
    /// Creates a new authentication error.
    #[must_use]
    pub fn new(reason: AuthFailure) -> Self {
        Self { reason }
    }
}

/// An error reported by an external provider.
#[derive(Debug, Clone, Error)]
#[error("{provider} {error_type}: {message}")]
pub struct ProviderError {
    /// The provider that failed (e.g. "litellm", "replicate").
    pub provider: String,
    /// The upstream error type name (e.g. "RateLimitError").
    pub error_type: String,
    /// The upstream error message.
    pub message: String,
    /// HTTP status, when the provider exposed one.
    pub status_code: Option<u16>,
}

impl ProviderError {
    /// Creates a new provider error.
    #[must_use]
    pub fn new(
        provider: impl Into<String>,
        error_type: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            provider: provider.into(),
            error_type: error_type.into(),
            message: message.into(),
            status_code: None,
        }
    }

    /// Sets the HTTP status code.
    #[must_use]
    pub fn with_status(mut self, status: u16) -> Self {
        self.status_code = Some(status);
        self
    }
}

/// Error raised when one attempt exceeds its timeout.
#[derive(Debug, Clone, Error)]
#[error("Operation '{operation}' timed out after {}ms", timeout.as_millis())]
pub struct TimeoutError {
    /// Name of the unit of work.
    pub operation: String,
    /// The per-attempt timeout that elapsed.
    pub timeout: Duration,
}

impl TimeoutError {
    /// Creates a new timeout error.
    #[must_use]
    pub fn new(operation: impl Into<String>, timeout: Duration) -> Self {
        Self {
            operation: operation.into(),
            timeout,
        }
    }
}

/// A failed fan-out branch.
#[derive(Debug, Clone)]
pub struct BranchFailure {
    /// Index of the branch in the submitted operation list.
    pub index: usize,
    /// The branch error.
    pub error: GenflowError,
}

impl BranchFailure {
    /// Creates a new branch failure.
    #[must_use]
    pub fn new(index: usize, error: GenflowError) -> Self {
        Self { index, error }
    }
}

impl fmt::Display for BranchFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.index, self.error)
    }
}

/// Error raised when every branch of a fan-out failed.
#[derive(Debug, Clone, Error)]
#[error(
    "All {} fan-out branches failed: {}",
    failures.len(),
    failures.iter().map(ToString::to_string).collect::<Vec<_>>().join("; ")
)]
pub struct AggregateFanOutError {
    /// Every branch failure, in index order.
    pub failures: Vec<BranchFailure>,
}

impl AggregateFanOutError {
    /// Creates a new aggregate error.
    #[must_use]
    pub fn new(failures: Vec<BranchFailure>) -> Self {
        Self { failures }
    }

    /// Converts to a dictionary representation.
    #[must_use]
    pub fn to_dict(&self) -> HashMap<String, serde_json::Value> {
        let mut map = HashMap::new();
        map.insert("message".to_string(), serde_json::json!(self.to_string()));
        map.insert(
            "failures".to_string(),
            serde_json::Value::Array(
                self.failures
                    .iter()
                    .map(|f| {
                        serde_json::json!({
                            "index": f.index,
                            "error_type": f.error.kind(),
                            "error": f.error.to_string(),
                        })
                    })
                    .collect(),
            ),
        );
        map
    }
}

/// Error raised when both the primary and fallback paths failed.
#[derive(Debug, Clone, Error)]
#[error(
    "Both primary ({primary_config}) and fallback ({fallback_config}) failed. \
     Primary error ({}): {primary}. Fallback error ({}): {fallback}",
    primary.kind(),
    fallback.kind()
)]
pub struct FallbackExhaustedError {
    /// Name of the primary configuration (e.g. model id).
    pub primary_config: String,
    /// Name of the fallback configuration.
    pub fallback_config: String,
    /// The primary failure.
    pub primary: Box<GenflowError>,
    /// The fallback failure.
    pub fallback: Box<GenflowError>,
}

impl FallbackExhaustedError {
    /// Creates a new fallback-exhausted error.
    #[must_use]
    pub fn new(
        primary_config: impl Into<String>,
        fallback_config: impl Into<String>,
        primary: GenflowError,
        fallback: GenflowError,
    ) -> Self {
        Self {
            primary_config: primary_config.into(),
            fallback_config: fallback_config.into(),
            primary: Box::new(primary),
            fallback: Box::new(fallback),
        }
    }

    /// Converts to a dictionary representation.
    #[must_use]
    pub fn to_dict(&self) -> HashMap<String, serde_json::Value> {
        let mut map = HashMap::new();
        map.insert("primary_config".to_string(), serde_json::json!(self.primary_config));
        map.insert("fallback_config".to_string(), serde_json::json!(self.fallback_config));
        map.insert(
            "primary".to_string(),
            serde_json::json!({
                "error_type": self.primary.kind(),
                "error": self.primary.to_string(),
            }),
        );
        map.insert(
            "fallback".to_string(),
            serde_json::json!({
                "error_type": self.fallback.kind(),
                "error": self.fallback.to_string(),
            }),
        );
        map
    }
}

/// Convenience result alias.
pub type Result<T, E = GenflowError> = std::result::Result<T, E>;
