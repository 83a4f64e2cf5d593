//! Testing utilities for genflow pipelines.
//!
//! This module provides:
//! - Scripted gateway doubles with call recording
//! - Candidate and input fixtures
//! - Assertions over pipeline status and events

mod assertions;
mod fixtures;
mod mocks;

pub use assertions::{
    assert_event_order, assert_failed_at, assert_pipeline_status, assert_steps_completed,
};
pub use fixtures::{authed_input, candidate, candidate_page};
pub use mocks::{
    RecordingRewriteGateway, RecordingStorageGateway, ScriptedCompletionGateway,
    ScriptedScraperGateway, StaticGenerationGateway,
};
