//! Pipeline context and step runner.
//!
//! A [`PipelineContext`] owns the status of one invocation: it authenticates
//! the input, runs each step body while recording progress, and emits a
//! transition event for every change. Observers hold a [`StatusHandle`].

#[cfg(test)]
mod context_tests;
mod execution;
mod status;

pub use execution::{PipelineContext, COMPLETE_STEP_ID};
pub use status::{StatusHandle, StatusSnapshot, StepFailure};
