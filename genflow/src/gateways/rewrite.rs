//! Best-effort media rewriting.
//!
//! Rewrite failures never fail a pipeline: the original URLs are kept and the
//! degradation is reported as a warning on the outcome.

use std::sync::Arc;

use tracing::{info, warn};

use super::traits::RewriteGateway;
use crate::core::RewriteDevice;
use crate::errors::GenflowError;

/// Allowed playback speed range for video rewrites.
pub const PLAYBACK_SPEED_RANGE: std::ops::RangeInclusive<f32> = 0.5..=2.0;

/// Result of a best-effort rewrite.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RewriteOutcome<T> {
    /// Rewritten value, or the original on failure.
    pub value: T,
    /// True when the original was kept because the rewrite failed.
    pub degraded: bool,
    /// Human-readable reason for the degradation.
    pub warning: Option<String>,
}

impl<T> RewriteOutcome<T> {
    fn rewritten(value: T) -> Self {
        Self {
            value,
            degraded: false,
            warning: None,
        }
    }

    fn kept_original(value: T, warning: String) -> Self {
        Self {
            value,
            degraded: true,
            warning: Some(warning),
        }
    }
}

/// Wraps a [`RewriteGateway`] so failures fall back to the original media.
#[derive(Clone)]
pub struct BestEffortRewriter {
    gateway: Arc<dyn RewriteGateway>,
}

impl BestEffortRewriter {
    /// Creates a rewriter over the gateway.
    #[must_use]
    pub fn new(gateway: Arc<dyn RewriteGateway>) -> Self {
        Self { gateway }
    }

    /// Rewrites images; keeps the originals on error or length mismatch.
    pub async fn rewrite_images(
        &self,
        urls: &[String],
        device: Option<RewriteDevice>,
    ) -> RewriteOutcome<Vec<String>> {
        if urls.is_empty() {
            return RewriteOutcome::rewritten(Vec::new());
        }

        info!(count = urls.len(), device = ?device, "Rewriting images");
        match self.gateway.rewrite_images(urls, device).await {
            Ok(rewritten) if rewritten.len() == urls.len() => RewriteOutcome::rewritten(rewritten),
            Ok(rewritten) => {
                let warning = format!(
                    "Image rewrite returned {} URLs for {} inputs; originals kept",
                    rewritten.len(),
                    urls.len()
                );
                warn!("{warning}");
                RewriteOutcome::kept_original(urls.to_vec(), warning)
            }
            Err(e) => {
                let warning = format!("Image rewrite failed; originals kept: {e}");
                warn!(error = %e, count = urls.len(), "Image rewrite failed, keeping originals");
                RewriteOutcome::kept_original(urls.to_vec(), warning)
            }
        }
    }

    /// Rewrites a video; keeps the original on error.
    ///
    /// # Errors
    ///
    /// Returns [`GenflowError::Validation`] if `playback_speed` is outside
    /// 0.5 to 2.0. Gateway failures are not errors.
    pub async fn rewrite_video(
        &self,
        url: &str,
        playback_speed: f32,
        device: Option<RewriteDevice>,
    ) -> Result<RewriteOutcome<String>, GenflowError> {
        if !PLAYBACK_SPEED_RANGE.contains(&playback_speed) {
            return Err(GenflowError::validation(format!(
                "playback_speed must be between 0.5 and 2.0, got {playback_speed}"
            )));
        }

        info!(url, playback_speed, device = ?device, "Rewriting video");
        Ok(match self.gateway.rewrite_video(url, playback_speed, device).await {
            Ok(rewritten) => RewriteOutcome::rewritten(rewritten),
            Err(e) => {
                warn!(error = %e, url, "Video rewrite failed, keeping original");
                RewriteOutcome::kept_original(
                    url.to_string(),
                    format!("Video rewrite failed; original kept: {e}"),
                )
            }
        })
    }
}
