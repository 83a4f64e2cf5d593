//! Configuration types for the engine.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::auth::AuthGate;
use crate::errors::GenflowError;
use crate::fallback::{FallbackPolicy, ModelConfig};

/// Top-level engine configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Pipeline entry authentication.
    #[serde(default)]
    pub auth: AuthSettings,
    /// Completion models and fallback.
    #[serde(default)]
    pub completion: CompletionSettings,
    /// Image collection pipeline parameters.
    #[serde(default)]
    pub collection: CollectionSettings,
    /// Logging output.
    #[serde(default)]
    pub logging: LogSettings,
}

impl EngineConfig {
    /// Creates a configuration with defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses a JSON document. Missing fields take their defaults.
    ///
    /// # Errors
    ///
    /// Returns [`GenflowError::Serialization`] for malformed JSON and
    /// [`GenflowError::Config`] if the result fails validation.
    pub fn from_json_str(json: &str) -> Result<Self, GenflowError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads and parses a JSON file.
    ///
    /// # Errors
    ///
    /// Returns [`GenflowError::Io`] if the file cannot be read, otherwise as
    /// [`EngineConfig::from_json_str`].
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, GenflowError> {
        let raw = std::fs::read_to_string(path.as_ref())?;
        Self::from_json_str(&raw)
    }

    /// Builds a configuration from `GENFLOW_*` environment variables.
    ///
    /// # Errors
    ///
    /// Returns [`GenflowError::Config`] for unparsable values or a result
    /// that fails validation.
    pub fn from_env() -> Result<Self, GenflowError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds a configuration from an arbitrary variable lookup.
    ///
    /// # Errors
    ///
    /// See [`EngineConfig::from_env`].
    pub fn from_lookup<F>(lookup: F) -> Result<Self, GenflowError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();
        super::env::apply(&mut config, lookup)?;
        config.validate()?;
        Ok(config)
    }

    /// Checks settings for inconsistencies.
    ///
    /// # Errors
    ///
    /// Returns [`GenflowError::Config`] naming the first problem found.
    pub fn validate(&self) -> Result<(), GenflowError> {
        if self.auth.secret_enabled
            && self.auth.secret_key.as_deref().map_or(true, str::is_empty)
        {
            return Err(GenflowError::config(
                "auth.secret_enabled is set but auth.secret_key is empty",
            ));
        }
        if self.completion.primary_model.trim().is_empty() {
            return Err(GenflowError::config("completion.primary_model must not be empty"));
        }
        if self.completion.fallback_enabled
            && self
                .completion
                .fallback_model
                .as_deref()
                .is_some_and(|m| m.trim().is_empty())
        {
            return Err(GenflowError::config("completion.fallback_model must not be empty"));
        }
        if self.completion.timeout_seconds <= 0.0 {
            return Err(GenflowError::config("completion.timeout_seconds must be positive"));
        }
        if self.collection.num_queries == 0 {
            return Err(GenflowError::config("collection.num_queries must be at least 1"));
        }
        if self.collection.pages_per_query == 0 {
            return Err(GenflowError::config("collection.pages_per_query must be at least 1"));
        }
        if self.collection.num_images == 0 {
            return Err(GenflowError::config("collection.num_images must be at least 1"));
        }
        if self.collection.query_model.trim().is_empty() {
            return Err(GenflowError::config("collection.query_model must not be empty"));
        }
        Ok(())
    }
}

/// Shared-secret authentication settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AuthSettings {
    /// Whether callers must present the secret.
    #[serde(default)]
    pub secret_enabled: bool,
    /// The server's secret.
    #[serde(default)]
    pub secret_key: Option<String>,
}

impl AuthSettings {
    /// Builds the gate for these settings.
    #[must_use]
    pub fn gate(&self) -> AuthGate {
        AuthGate::new(self.secret_enabled, self.secret_key.clone())
    }
}

/// Completion model settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionSettings {
    /// Primary model identifier.
    #[serde(default = "default_primary_model")]
    pub primary_model: String,
    /// Fallback model identifier; `None` disables fallback.
    #[serde(default = "default_fallback_model")]
    pub fallback_model: Option<String>,
    /// Whether transient primary failures switch to the fallback.
    #[serde(default = "default_true")]
    pub fallback_enabled: bool,
    /// Provider-side retries applied per model.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    /// Per-call timeout in seconds.
    #[serde(default = "default_completion_timeout")]
    pub timeout_seconds: f64,
}

fn default_primary_model() -> String {
    "gemini/gemini-2.0-flash".to_string()
}

#[allow(clippy::unnecessary_wraps)]
fn default_fallback_model() -> Option<String> {
    Some("openai/gpt-5-nano".to_string())
}

fn default_true() -> bool {
    true
}

fn default_max_retries() -> u32 {
    2
}

fn default_completion_timeout() -> f64 {
    120.0
}

impl Default for CompletionSettings {
    fn default() -> Self {
        Self {
            primary_model: default_primary_model(),
            fallback_model: default_fallback_model(),
            fallback_enabled: default_true(),
            max_retries: default_max_retries(),
            timeout_seconds: default_completion_timeout(),
        }
    }
}

impl CompletionSettings {
    /// Gets the timeout as a Duration.
    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_secs_f64(self.timeout_seconds)
    }

    /// Builds the fallback policy for these settings.
    #[must_use]
    pub fn policy(&self) -> FallbackPolicy {
        let primary = ModelConfig::new(&self.primary_model)
            .with_max_retries(self.max_retries)
            .with_timeout(self.timeout());
        let mut policy = FallbackPolicy::new(primary).with_enabled(self.fallback_enabled);
        if let Some(model) = &self.fallback_model {
            policy = policy.with_fallback(
                ModelConfig::new(model)
                    .with_max_retries(self.max_retries)
                    .with_timeout(self.timeout()),
            );
        }
        policy
    }
}

/// Parameters for the image collection pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollectionSettings {
    /// Number of search queries generated per run.
    #[serde(default = "default_num_queries")]
    pub num_queries: usize,
    /// Result pages scraped per query.
    #[serde(default = "default_pages_per_query")]
    pub pages_per_query: u32,
    /// Number of images selected.
    #[serde(default = "default_num_images")]
    pub num_images: usize,
    /// Model used to generate queries.
    #[serde(default = "default_query_model")]
    pub query_model: String,
    /// Sampling temperature for query generation.
    #[serde(default = "default_query_temperature")]
    pub query_temperature: f32,
    /// Token limit for query generation.
    #[serde(default = "default_query_max_tokens")]
    pub query_max_tokens: u32,
}

fn default_num_queries() -> usize {
    5
}

fn default_pages_per_query() -> u32 {
    2
}

fn default_num_images() -> usize {
    25
}

fn default_query_model() -> String {
    "gemini/gemini-2.0-flash-lite".to_string()
}

fn default_query_temperature() -> f32 {
    0.9
}

fn default_query_max_tokens() -> u32 {
    512
}

impl Default for CollectionSettings {
    fn default() -> Self {
        Self {
            num_queries: default_num_queries(),
            pages_per_query: default_pages_per_query(),
            num_images: default_num_images(),
            query_model: default_query_model(),
            query_temperature: default_query_temperature(),
            query_max_tokens: default_query_max_tokens(),
        }
    }
}

/// Logging settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogSettings {
    /// Filter directive used when `RUST_LOG` is unset.
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Emit JSON lines instead of compact text.
    #[serde(default)]
    pub json: bool,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LogSettings {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}
