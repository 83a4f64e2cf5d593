//! External collaborators.
//!
//! This module provides:
//! - Async ports for generation, scraping, rewriting, storage and completion
//! - The request/response types they exchange
//! - [`Gateways`], the dependency table injected into pipelines
//! - [`BestEffortRewriter`], which downgrades rewrite failures to warnings

mod registry;
mod rewrite;
mod traits;
mod types;

pub use registry::{Gateways, GatewaysBuilder};
pub use rewrite::{BestEffortRewriter, RewriteOutcome, PLAYBACK_SPEED_RANGE};
pub use traits::{
    CompletionGateway, GenerationGateway, RewriteGateway, ScraperGateway, StorageGateway,
};
#[cfg(test)]
pub use traits::{
    MockCompletionGateway, MockGenerationGateway, MockRewriteGateway, MockScraperGateway,
    MockStorageGateway,
};
pub use types::{
    ChatMessage, CompletionRequest, CompletionResponse, GeneratedMedia, GenerationKind,
    GenerationRequest, MessageRole, ModelConfig, StoredObject, TokenUsage, UploadRequest,
    UploadSource,
};
