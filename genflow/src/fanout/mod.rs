//! Structured fan-out/gather.
//!
//! Independent branches (one scrape per query, one upload per output) run
//! as tokio tasks. Results come back in submission order; partial failure
//! is tolerated, total failure is reported with every branch's error.

mod gather;

pub use gather::{FanOutGatherRunner, GatherOutcome};
