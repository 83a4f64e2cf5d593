//! Result of a fallback-aware unit of work.

use serde::{Deserialize, Serialize};

/// A unit-of-work payload plus provenance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitOfWorkResult<T> {
    /// The payload.
    pub value: T,
    /// True when the fallback configuration served the result.
    pub fallback_used: bool,
    /// Name of the configuration that served the result.
    pub served_by: String,
}

impl<T> UnitOfWorkResult<T> {
    /// Creates a result served by the primary configuration.
    #[must_use]
    pub fn primary(value: T, served_by: impl Into<String>) -> Self {
        Self {
            value,
            fallback_used: false,
            served_by: served_by.into(),
        }
    }

    /// Creates a result served by the fallback configuration.
    #[must_use]
    pub fn fallback(value: T, served_by: impl Into<String>) -> Self {
        Self {
            value,
            fallback_used: true,
            served_by: served_by.into(),
        }
    }

    /// Transforms the payload, keeping provenance.
    pub fn map<U, F: FnOnce(T) -> U>(self, f: F) -> UnitOfWorkResult<U> {
        UnitOfWorkResult {
            value: f(self.value),
            fallback_used: self.fallback_used,
            served_by: self.served_by,
        }
    }

    /// Transforms the payload with a fallible function, keeping provenance.
    ///
    /// # Errors
    ///
    /// Returns whatever `f` returns.
    pub fn try_map<U, E, F: FnOnce(T) -> Result<U, E>>(self, f: F) -> Result<UnitOfWorkResult<U>, E> {
        Ok(UnitOfWorkResult {
            value: f(self.value)?,
            fallback_used: self.fallback_used,
            served_by: self.served_by,
        })
    }
}
