//! # Genflow
//!
//! Orchestration core for multi-stage content-generation pipelines.
//!
//! Genflow wires slow, failure-prone collaborators (image and video models,
//! scrapers, storage) into pipelines with:
//!
//! - **Retried units of work**: per-attempt timeouts, tiered backoff and heartbeats
//! - **Model fallback**: one escalation to a secondary model on transient failures
//! - **Fan-out/gather**: concurrent branches with partial-failure tolerance
//! - **Observable progress**: a shared status snapshot plus lifecycle events
//! - **Deterministic selection**: dedup, scoring and diversity over scraped candidates
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use genflow::prelude::*;
//!
//! let gateways = Gateways::builder()
//!     .completion(completion)
//!     .scraper(scraper)
//!     .storage(storage)
//!     .build();
//! let config = EngineConfig::from_env()?;
//!
//! let mut pipeline = ImageCollectionPipeline::new(&gateways, &config)?;
//! let output = pipeline.run(&ImageCollectionInput::new("cozy autumn")).await?;
//! ```

#![forbid(unsafe_code)]
#![warn(
    clippy::all,
    clippy::pedantic,
    missing_docs,
    rust_2018_idioms
)]
#![allow(
    clippy::module_name_repetitions,
    clippy::must_use_candidate,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc
)]

pub mod auth;
pub mod cancellation;
pub mod config;
pub mod context;
pub mod core;
pub mod errors;
pub mod events;
pub mod execution;
pub mod fallback;
pub mod fanout;
pub mod gateways;
pub mod observability;
pub mod pipelines;
pub mod selection;
pub mod testing;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::auth::AuthGate;
    pub use crate::cancellation::CancellationToken;
    pub use crate::config::EngineConfig;
    pub use crate::context::{PipelineContext, StatusHandle, StatusSnapshot};
    pub use crate::core::{PipelineInput, PipelineStatus, RewriteDevice, StepProgress, StepStatus};
    pub use crate::errors::GenflowError;
    pub use crate::events::{EventSink, LoggingEventSink, NoOpEventSink};
    pub use crate::execution::{RetryPolicy, UnitOfWorkExecutor, UnitOfWorkResult, UnitOptions};
    pub use crate::fallback::{FallbackCompletionClient, FallbackPolicy, ModelConfig};
    pub use crate::fanout::{FanOutGatherRunner, GatherOutcome};
    pub use crate::gateways::{
        CompletionGateway, GenerationGateway, Gateways, RewriteGateway, ScraperGateway,
        StorageGateway,
    };
    pub use crate::observability::init_tracing;
    pub use crate::pipelines::{
        ImageCollectionInput, ImageCollectionOutput, ImageCollectionPipeline, ReactionVideoInput,
        ReactionVideoOutput, ReactionVideoPipeline,
    };
    pub use crate::selection::{Candidate, SelectionConfig, SelectionEngine};
}
