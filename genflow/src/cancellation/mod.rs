//! Cooperative cancellation.
//!
//! A [`CancellationToken`] is shared between a pipeline's host and the
//! executors doing its work. Cancellation is only observed at suspension
//! points; nothing is interrupted mid-instruction.

mod token;

pub use token::CancellationToken;
