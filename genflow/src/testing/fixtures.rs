//! Candidate and input fixtures.

use crate::core::PipelineInput;
use crate::selection::Candidate;

/// A well-formed portrait candidate whose URL ends in `{query}/{index}.jpg`.
#[must_use]
pub fn candidate(query: &str, index: usize) -> Candidate {
    let slug = query.replace(' ', "-");
    Candidate::new(format!("https://i.pinimg.com/736x/{slug}/{index}.jpg"))
        .with_id(format!("{slug}-{index}"))
        .with_title(format!("{query} #{index}"))
        .with_size(736, 1308)
        .with_aspect_ratio("9:16")
}

/// `count` distinct candidates for `query`.
#[must_use]
pub fn candidate_page(query: &str, count: usize) -> Vec<Candidate> {
    (0..count).map(|i| candidate(query, i)).collect()
}

/// A pipeline input carrying `secret`.
#[must_use]
pub fn authed_input(secret: &str) -> PipelineInput {
    PipelineInput::default().with_secret_key(secret)
}
