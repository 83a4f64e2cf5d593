//! Core domain model types for genflow.
//!
//! This module contains the fundamental types shared by every pipeline:
//! - Pipeline and step status enums
//! - Step progress records
//! - Pipeline input and rewrite device presets

mod input;
mod status;

pub use input::{PipelineInput, RewriteDevice};
pub use status::{PipelineStatus, StepProgress, StepStatus};
