//! Shared-secret authentication for pipeline entry.

use sha2::{Digest, Sha256};
use tracing::warn;

use crate::core::PipelineInput;
use crate::errors::{AuthFailure, AuthenticationError, GenflowError};

/// Validates the caller's secret before any pipeline step runs.
#[derive(Debug, Clone, Default)]
pub struct AuthGate {
    secret_required: bool,
    server_secret: Option<String>,
}

impl AuthGate {
    /// Creates a gate with the server's auth settings.
    #[must_use]
    pub fn new(secret_required: bool, server_secret: Option<String>) -> Self {
        Self {
            secret_required,
            server_secret,
        }
    }

    /// Creates a gate that accepts every caller.
    #[must_use]
    pub fn disabled() -> Self {
        Self::default()
    }

    /// Returns true if a secret is required.
    #[must_use]
    pub fn is_required(&self) -> bool {
        self.secret_required
    }

    /// Checks the input against this gate's settings.
    ///
    /// # Errors
    ///
    /// See [`AuthGate::validate`].
    pub fn check(&self, input: &PipelineInput) -> Result<(), GenflowError> {
        Self::validate(input, self.secret_required, self.server_secret.as_deref())
    }

    /// Validates `input.secret_key` against the server secret.
    ///
    /// An empty server secret counts as not configured.
    ///
    /// # Errors
    ///
    /// Returns [`GenflowError::Authentication`] when auth is required and the
    /// server secret is missing, or when the submitted key does not match.
    pub fn validate(
        input: &PipelineInput,
        secret_required: bool,
        server_secret: Option<&str>,
    ) -> Result<(), GenflowError> {
        if !secret_required {
            return Ok(());
        }

        let Some(expected) = server_secret.filter(|s| !s.is_empty()) else {
            warn!("Pipeline auth is enabled but no server secret is configured");
            return Err(AuthenticationError::new(AuthFailure::SecretNotConfigured).into());
        };

        match input.secret_key.as_deref() {
            Some(provided) if digest_eq(provided, expected) => Ok(()),
            _ => {
                warn!(provided = input.secret_key.is_some(), "Pipeline auth rejected");
                Err(AuthenticationError::new(AuthFailure::InvalidSecret).into())
            }
        }
    }
}

/// Compares two secrets over fixed-length SHA-256 digests.
fn digest_eq(a: &str, b: &str) -> bool {
    let da = Sha256::digest(a.as_bytes());
    let db = Sha256::digest(b.as_bytes());
    da.iter().zip(db.iter()).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn auth_reason(result: Result<(), GenflowError>) -> AuthFailure {
        match result {
            Err(GenflowError::Authentication(e)) => e.reason,
            other => panic!("expected authentication error, got {other:?}"),
        }
    }

    #[test]
    fn test_not_required_always_passes() {
        let input = PipelineInput::new();
        assert!(AuthGate::validate(&input, false, None).is_ok());
        assert!(AuthGate::validate(&input.with_secret_key("wrong"), false, Some("right")).is_ok());
    }

    #[test]
    fn test_required_without_server_secret() {
        let input = PipelineInput::new().with_secret_key("anything");
        assert_eq!(
            auth_reason(AuthGate::validate(&input, true, None)),
            AuthFailure::SecretNotConfigured
        );
        assert_eq!(
            auth_reason(AuthGate::validate(&input, true, Some(""))),
            AuthFailure::SecretNotConfigured
        );
    }

    #[test]
    fn test_required_with_matching_secret() {
        let input = PipelineInput::new().with_secret_key("s3cret");
        assert!(AuthGate::validate(&input, true, Some("s3cret")).is_ok());
    }

    #[test]
    fn test_required_with_wrong_or_missing_secret() {
        let wrong = PipelineInput::new().with_secret_key("s3cret ");
        assert_eq!(
            auth_reason(AuthGate::validate(&wrong, true, Some("s3cret"))),
            AuthFailure::InvalidSecret
        );
        assert_eq!(
            auth_reason(AuthGate::validate(&PipelineInput::new(), true, Some("s3cret"))),
            AuthFailure::InvalidSecret
        );
    }

    #[test]
    fn test_gate_check_uses_settings() {
        let gate = AuthGate::new(true, Some("k".to_string()));
        assert!(gate.is_required());
        assert!(gate.check(&PipelineInput::new().with_secret_key("k")).is_ok());
        assert!(gate.check(&PipelineInput::new()).is_err());
        assert!(AuthGate::disabled().check(&PipelineInput::new()).is_ok());
    }
}
