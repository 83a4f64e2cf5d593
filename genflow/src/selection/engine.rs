//! Dedup, score, sort and diversity-filter candidates.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use tracing::info;

use super::fingerprint::{fingerprint, is_too_similar};
use super::scoring::{
    identity_points, keyword_penalty, matched_keywords, metadata_points, resolution_points,
    AspectScores, DEFAULT_BLOCKLIST,
};
use super::{Candidate, ScoredCandidate};

/// Tunables for the selection engine.
#[derive(Debug, Clone, PartialEq)]
pub struct SelectionConfig {
    /// Fingerprint prefix compared for similarity.
    pub diversity_prefix_len: usize,
    /// Hex chars kept from the MD5 digest.
    pub fingerprint_len: usize,
    /// Trailing URL path segments folded into the fingerprint.
    pub url_segments: usize,
    /// Aspect ratio preferences.
    pub aspect_scores: AspectScores,
    /// Lowercase keywords that penalize a candidate.
    pub blocklist: Vec<String>,
}

impl Default for SelectionConfig {
    fn default() -> Self {
        Self {
            diversity_prefix_len: 4,
            fingerprint_len: 8,
            url_segments: 3,
            aspect_scores: AspectScores::default(),
            blocklist: DEFAULT_BLOCKLIST.iter().map(ToString::to_string).collect(),
        }
    }
}

impl SelectionConfig {
    /// Sets the similarity prefix length.
    #[must_use]
    pub fn with_diversity_prefix_len(mut self, len: usize) -> Self {
        self.diversity_prefix_len = len;
        self
    }

    /// Replaces the keyword block-list.
    #[must_use]
    pub fn with_blocklist<I, S>(mut self, keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.blocklist = keywords
            .into_iter()
            .map(|k| k.into().to_lowercase())
            .collect();
        self
    }

    /// Replaces the aspect ratio preferences.
    #[must_use]
    pub fn with_aspect_scores(mut self, scores: AspectScores) -> Self {
        self.aspect_scores = scores;
        self
    }
}

/// Counters describing one selection pass.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SelectionReport {
    /// Candidates received.
    pub input: usize,
    /// Candidates left after dedup.
    pub unique: usize,
    /// Unique candidates with a negative score.
    pub penalized: usize,
    /// Candidates skipped as too similar to a selected one.
    pub skipped_similar: usize,
    /// Candidates returned.
    pub selected: usize,
    /// Lowest score among unique candidates.
    pub min_score: Option<f64>,
    /// Highest score among unique candidates.
    pub max_score: Option<f64>,
}

/// Picks the best diverse candidates from a scraped pool.
///
/// Deterministic: the same input always yields the same output.
#[derive(Debug, Clone, Default)]
pub struct SelectionEngine {
    config: SelectionConfig,
}

impl SelectionEngine {
    /// Creates an engine with default tunables.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an engine with custom tunables.
    #[must_use]
    pub fn with_config(config: SelectionConfig) -> Self {
        Self { config }
    }

    /// Returns the active configuration.
    #[must_use]
    pub fn config(&self) -> &SelectionConfig {
        &self.config
    }

    /// Keeps the first occurrence of each URL and drops URL-less candidates.
    #[must_use]
    pub fn dedup(&self, candidates: &[Candidate]) -> Vec<Candidate> {
        let mut seen = HashSet::new();
        candidates
            .iter()
            .filter(|c| c.url().is_some_and(|url| seen.insert(url.to_string())))
            .cloned()
            .collect()
    }

    /// Keyword penalty for a candidate.
    #[must_use]
    pub fn penalty(&self, candidate: &Candidate) -> f64 {
        keyword_penalty(matched_keywords(candidate, &self.config.blocklist))
    }

    /// Quality score: resolution + metadata + aspect + identity - penalty.
    #[must_use]
    pub fn score(&self, candidate: &Candidate) -> f64 {
        resolution_points(candidate)
            + metadata_points(candidate)
            + self.config.aspect_scores.points(candidate)
            + identity_points(candidate)
            - self.penalty(candidate)
    }

    /// Diversity fingerprint for a candidate.
    #[must_use]
    pub fn fingerprint(&self, candidate: &Candidate) -> String {
        fingerprint(
            candidate,
            self.config.url_segments,
            self.config.fingerprint_len,
        )
    }

    /// Returns up to `k` diverse candidates, best first.
    #[must_use]
    pub fn select(&self, candidates: &[Candidate], k: usize) -> Vec<Candidate> {
        self.select_scored(candidates, k)
            .0
            .into_iter()
            .map(|s| s.candidate)
            .collect()
    }

    /// Like [`select`](Self::select) but keeps scores and fingerprints and
    /// returns the pass counters.
    #[must_use]
    pub fn select_scored(
        &self,
        candidates: &[Candidate],
        k: usize,
    ) -> (Vec<ScoredCandidate>, SelectionReport) {
        let mut scored: Vec<ScoredCandidate> = self
            .dedup(candidates)
            .into_iter()
            .map(|candidate| ScoredCandidate {
                score: self.score(&candidate),
                fingerprint: self.fingerprint(&candidate),
                candidate,
            })
            .collect();

        // sort_by is stable; ties keep input order.
        scored.sort_by(|a, b| b.score.total_cmp(&a.score));

        let mut report = SelectionReport {
            input: candidates.len(),
            unique: scored.len(),
            penalized: scored.iter().filter(|s| s.score < 0.0).count(),
            max_score: scored.first().map(|s| s.score),
            min_score: scored.last().map(|s| s.score),
            ..SelectionReport::default()
        };

        info!(
            unique = report.unique,
            min_score = report.min_score.unwrap_or_default(),
            max_score = report.max_score.unwrap_or_default(),
            penalized = report.penalized,
            "Scored candidates"
        );

        let mut selected: Vec<ScoredCandidate> = Vec::with_capacity(k.min(scored.len()));
        let mut fingerprints: Vec<String> = Vec::new();

        for entry in scored {
            if selected.len() >= k {
                break;
            }
            if is_too_similar(
                &entry.fingerprint,
                &fingerprints,
                self.config.diversity_prefix_len,
            ) {
                report.skipped_similar += 1;
                continue;
            }
            fingerprints.push(entry.fingerprint.clone());
            selected.push(entry);
        }

        report.selected = selected.len();
        info!(
            selected = report.selected,
            skipped_similar = report.skipped_similar,
            "Selected candidates"
        );

        (selected, report)
    }
}
