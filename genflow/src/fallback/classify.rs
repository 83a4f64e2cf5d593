//! Transient-failure classification.
//!
//! Upstream providers do not share an error hierarchy, so classification
//! falls back to substring matching on the rendered message.

use crate::errors::GenflowError;

const DEFAULT_TYPE_ALLOW_LIST: [&str; 4] = [
    "RateLimitError",
    "APIConnectionError",
    "Timeout",
    "ServiceUnavailableError",
];

const DEFAULT_INDICATORS: [&str; 8] = [
    "rate limit",
    "timeout",
    "connection",
    "unavailable",
    "overloaded",
    "429",
    "502",
    "503",
];

/// Decides whether a failure is worth escalating to a fallback configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransientClassifier {
    type_allow_list: Vec<String>,
    indicators: Vec<String>,
}

impl Default for TransientClassifier {
    fn default() -> Self {
        Self {
            type_allow_list: DEFAULT_TYPE_ALLOW_LIST.iter().map(ToString::to_string).collect(),
            indicators: DEFAULT_INDICATORS.iter().map(ToString::to_string).collect(),
        }
    }
}

impl TransientClassifier {
    /// Creates a classifier with the default allow-list and indicators.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an error type name to the allow-list.
    #[must_use]
    pub fn with_type(mut self, type_name: impl Into<String>) -> Self {
        self.type_allow_list.push(type_name.into());
        self
    }

    /// Adds a message indicator (matched case-insensitively).
    #[must_use]
    pub fn with_indicator(mut self, indicator: impl Into<String>) -> Self {
        self.indicators.push(indicator.into().to_lowercase());
        self
    }

    /// Returns true if `error` is transient.
    ///
    /// Cancellation is never transient. Timeouts and transient provider
    /// errors always are. Anything else is transient if its type name
    /// contains an allow-listed name, or its message contains an
    /// allow-listed name or an indicator.
    #[must_use]
    pub fn is_transient(&self, error: &GenflowError) -> bool {
        match error {
            GenflowError::Cancelled(_) => return false,
            GenflowError::Timeout(_) | GenflowError::TransientProvider(_) => return true,
            _ => {}
        }

        let type_name = error.kind();
        let message = error.to_string().to_lowercase();

        self.type_allow_list
            .iter()
            .any(|name| type_name.contains(name.as_str()) || message.contains(&name.to_lowercase()))
            || self.indicators.iter().any(|ind| message.contains(ind.as_str()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::{ProviderError, TimeoutError};
    use std::time::Duration;

    fn provider(error_type: &str, message: &str) -> GenflowError {
        ProviderError::new("litellm", error_type, message).into()
    }

    #[test]
    fn test_kinds_always_transient() {
        let classifier = TransientClassifier::new();
        assert!(classifier.is_transient(&GenflowError::transient("whatever")));
        assert!(classifier.is_transient(&TimeoutError::new("complete", Duration::from_secs(1)).into()));
    }

    #[test]
    fn test_cancellation_never_transient() {
        let classifier = TransientClassifier::new();
        assert!(!classifier.is_transient(&GenflowError::cancelled("connection closed by host")));
    }

    #[test]
    fn test_type_allow_list() {
        let classifier = TransientClassifier::new();
        assert!(classifier.is_transient(&provider("RateLimitError", "quota")));
        assert!(classifier.is_transient(&provider("APITimeoutError", "took too long")));
        assert!(classifier.is_transient(&provider("ServiceUnavailableError", "down")));
        assert!(!classifier.is_transient(&provider("BadRequestError", "invalid prompt")));
    }

    #[test]
    fn test_message_indicators() {
        let classifier = TransientClassifier::new();
        assert!(classifier.is_transient(&provider("APIError", "HTTP 503 from upstream")));
        assert!(classifier.is_transient(&provider("APIError", "Model is OVERLOADED")));
        assert!(classifier.is_transient(&provider("APIError", "ratelimiterror raised")));
        assert!(classifier.is_transient(&GenflowError::Io("connection reset by peer".into())));
        assert!(!classifier.is_transient(&provider("AuthenticationError", "invalid api key")));
        assert!(!classifier.is_transient(&GenflowError::validation("prompt must not be empty")));
    }

    #[test]
    fn test_custom_indicator() {
        let classifier = TransientClassifier::new().with_indicator("Try Again");
        assert!(classifier.is_transient(&provider("APIError", "please try again later")));
        let classifier = TransientClassifier::new().with_type("ContentFilterError");
        assert!(classifier.is_transient(&provider("ContentFilterError", "blocked")));
    }
}
