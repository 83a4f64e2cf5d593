//! Unit-of-work execution.
//!
//! This module provides:
//! - Retry tiers with capped exponential backoff
//! - An executor that applies a per-attempt timeout, retries, heartbeats
//!   and cooperative cancellation
//! - The provenance-carrying result of fallback-aware calls

mod executor;
mod result;
mod retry;

pub use executor::{Attempt, UnitOfWorkExecutor, UnitOptions};
pub use result::UnitOfWorkResult;
pub use retry::{JitterStrategy, RetryPolicy};
