//! Collaborator ports.
//!
//! Concrete provider clients live outside this crate. Pipelines depend only
//! on these traits, injected as `Arc<dyn Trait>` through [`super::Gateways`].

use async_trait::async_trait;

use super::types::{
    CompletionRequest, CompletionResponse, GeneratedMedia, GenerationRequest, ModelConfig,
    StoredObject, UploadRequest,
};
use crate::core::RewriteDevice;
use crate::errors::GenflowError;
use crate::selection::Candidate;

/// Produces images, videos and post-processed media.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait GenerationGateway: Send + Sync {
    /// Runs one generation job and returns the produced media.
    async fn generate(&self, request: &GenerationRequest) -> Result<GeneratedMedia, GenflowError>;
}

/// Scrapes candidate images for a search query.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ScraperGateway: Send + Sync {
    /// Returns candidates from the first `pages` result pages.
    async fn scrape(&self, query: &str, pages: u32) -> Result<Vec<Candidate>, GenflowError>;
}

/// Re-encodes media so it carries fresh device metadata.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RewriteGateway: Send + Sync {
    /// Rewrites images, returning one URL per input, in order.
    async fn rewrite_images(
        &self,
        urls: &[String],
        device: Option<RewriteDevice>,
    ) -> Result<Vec<String>, GenflowError>;

    /// Rewrites a video with the given playback speed.
    async fn rewrite_video(
        &self,
        url: &str,
        playback_speed: f32,
        device: Option<RewriteDevice>,
    ) -> Result<String, GenflowError>;
}

/// Persists content and returns a permanent URL.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait StorageGateway: Send + Sync {
    /// Uploads one object.
    async fn upload(&self, request: &UploadRequest) -> Result<StoredObject, GenflowError>;
}

/// Talks to a completion provider.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CompletionGateway: Send + Sync {
    /// Runs one completion against `config`, applying `config.max_retries`
    /// internally.
    async fn complete(
        &self,
        request: &CompletionRequest,
        config: &ModelConfig,
    ) -> Result<CompletionResponse, GenflowError>;
}
