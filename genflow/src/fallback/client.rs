//! Completion client with primary-to-fallback escalation.

use std::sync::{Arc, LazyLock};

use regex::Regex;
use serde::de::DeserializeOwned;
use tracing::{info, warn};

use super::TransientClassifier;
use crate::errors::{FallbackExhaustedError, GenflowError};
use crate::execution::UnitOfWorkResult;
use crate::gateways::{CompletionGateway, CompletionRequest, CompletionResponse, ModelConfig};

static JSON_FENCE: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"(?s)^\s*```(?:json|JSON)?\s*(.*?)\s*```\s*$").ok());

/// How a completion escalates from the primary to the fallback model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FallbackPolicy {
    /// Primary model configuration.
    pub primary: ModelConfig,
    /// Fallback model configuration, if any.
    pub fallback: Option<ModelConfig>,
    /// Whether escalation is allowed at all.
    pub enabled: bool,
    /// Decides which primary failures escalate.
    pub classifier: TransientClassifier,
}

impl FallbackPolicy {
    /// Creates an enabled policy with no fallback model.
    #[must_use]
    pub fn new(primary: ModelConfig) -> Self {
        Self {
            primary,
            fallback: None,
            enabled: true,
            classifier: TransientClassifier::default(),
        }
    }

    /// Sets the fallback model configuration.
    #[must_use]
    pub fn with_fallback(mut self, fallback: ModelConfig) -> Self {
        self.fallback = Some(fallback);
        self
    }

    /// Enables or disables escalation.
    #[must_use]
    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// Replaces the classifier.
    #[must_use]
    pub fn with_classifier(mut self, classifier: TransientClassifier) -> Self {
        self.classifier = classifier;
        self
    }
}

/// Completion client that retries once against a fallback model on
/// transient primary failures.
#[derive(Clone)]
pub struct FallbackCompletionClient {
    gateway: Arc<dyn CompletionGateway>,
    policy: FallbackPolicy,
}

impl std::fmt::Debug for FallbackCompletionClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FallbackCompletionClient")
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}

impl FallbackCompletionClient {
    /// Creates a client over a completion gateway.
    #[must_use]
    pub fn new(gateway: Arc<dyn CompletionGateway>, policy: FallbackPolicy) -> Self {
        Self { gateway, policy }
    }

    /// Returns the policy.
    #[must_use]
    pub fn policy(&self) -> &FallbackPolicy {
        &self.policy
    }

    /// Runs a completion, escalating once to the fallback model on a
    /// transient primary failure.
    ///
    /// `request.model`, when set, overrides the primary model name.
    ///
    /// # Errors
    ///
    /// - The primary error, unchanged, if escalation is disabled, no fallback
    ///   is configured, or the error is not transient.
    /// - [`GenflowError::FallbackExhausted`] if the fallback also fails.
    pub async fn complete(
        &self,
        request: &CompletionRequest,
    ) -> Result<UnitOfWorkResult<CompletionResponse>, GenflowError> {
        let primary = match &request.model {
            Some(model) => self.policy.primary.with_model(model.clone()),
            None => self.policy.primary.clone(),
        };

        let primary_error = match self.gateway.complete(request, &primary).await {
            Ok(response) => return Ok(UnitOfWorkResult::primary(response, primary.model)),
            Err(e) => e,
        };

        let fallback = match &self.policy.fallback {
            Some(fallback) if self.policy.enabled => fallback,
            _ => return Err(primary_error),
        };

        if !self.policy.classifier.is_transient(&primary_error) {
            return Err(primary_error);
        }

        warn!(
            primary = %primary.model,
            fallback = %fallback.model,
            error_type = primary_error.kind(),
            error = %primary_error,
            "Primary model failed, trying fallback"
        );

        match self.gateway.complete(request, fallback).await {
            Ok(response) => {
                info!(model = %fallback.model, "Fallback model served completion");
                Ok(UnitOfWorkResult::fallback(response, fallback.model.clone()))
            }
            Err(fallback_error) => Err(FallbackExhaustedError::new(
                primary.model,
                fallback.model.clone(),
                primary_error,
                fallback_error,
            )
            .into()),
        }
    }

    /// Completes a single prompt with an optional system prompt.
    ///
    /// # Errors
    ///
    /// See [`FallbackCompletionClient::complete`].
    pub async fn complete_text(
        &self,
        prompt: &str,
        system: Option<&str>,
    ) -> Result<UnitOfWorkResult<CompletionResponse>, GenflowError> {
        self.complete(&CompletionRequest::prompt(prompt, system)).await
    }

    /// Completes a single prompt in JSON mode and parses the content.
    ///
    /// # Errors
    ///
    /// See [`FallbackCompletionClient::complete_json_request`].
    pub async fn complete_json(
        &self,
        prompt: &str,
        system: Option<&str>,
    ) -> Result<UnitOfWorkResult<serde_json::Value>, GenflowError> {
        self.complete_json_request(CompletionRequest::prompt(prompt, system))
            .await
    }

    /// Runs `request` in JSON mode and parses the content.
    ///
    /// A fenced ```` ```json ```` block is accepted.
    ///
    /// # Errors
    ///
    /// See [`FallbackCompletionClient::complete`]; additionally
    /// [`GenflowError::Serialization`] if the content is not valid JSON.
    pub async fn complete_json_request(
        &self,
        request: CompletionRequest,
    ) -> Result<UnitOfWorkResult<serde_json::Value>, GenflowError> {
        let result = self.complete(&request.json()).await?;
        result.try_map(|response| parse_json_content(&response.content))
    }

    /// Like [`complete_json`](Self::complete_json), deserializing into `T`.
    ///
    /// # Errors
    ///
    /// See [`FallbackCompletionClient::complete_json_request`].
    pub async fn complete_json_as<T: DeserializeOwned>(
        &self,
        prompt: &str,
        system: Option<&str>,
    ) -> Result<UnitOfWorkResult<T>, GenflowError> {
        let result = self.complete_json(prompt, system).await?;
        result.try_map(|value| serde_json::from_value(value).map_err(GenflowError::from))
    }
}

/// Parses model output as JSON, unwrapping a Markdown code fence if present.
///
/// # Errors
///
/// Returns [`GenflowError::Serialization`] if the content is not valid JSON.
pub fn parse_json_content(content: &str) -> Result<serde_json::Value, GenflowError> {
    let body = JSON_FENCE
        .as_ref()
        .and_then(|re| re.captures(content))
        .and_then(|caps| caps.get(1))
        .map_or(content, |m| m.as_str());

    serde_json::from_str(body.trim()).map_err(|e| {
        GenflowError::Serialization(format!("Failed to parse JSON response: {e}"))
    })
}
