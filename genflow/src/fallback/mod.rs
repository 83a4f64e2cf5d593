//! Fallback-aware completion.
//!
//! A primary model serves every request. Transient failures escalate exactly
//! once to a fallback model; anything else propagates unchanged.

mod classify;
mod client;

pub use classify::TransientClassifier;
pub use client::{parse_json_content, FallbackCompletionClient, FallbackPolicy};
pub use crate::gateways::ModelConfig;
