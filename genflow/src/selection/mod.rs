//! Candidate selection.
//!
//! Scraped candidates are deduplicated by URL, scored on resolution,
//! metadata, aspect ratio and identity minus a keyword penalty, sorted
//! (stably) best-first, then walked greedily while skipping near-duplicates
//! by fingerprint prefix.

mod candidate;
mod engine;
mod fingerprint;
mod scoring;

#[cfg(test)]
mod selection_tests;

pub use candidate::{Candidate, ScoredCandidate};
pub use engine::{SelectionConfig, SelectionEngine, SelectionReport};
pub use scoring::{AspectScores, DEFAULT_BLOCKLIST};
