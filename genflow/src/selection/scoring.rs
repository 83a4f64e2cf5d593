//! Candidate quality scoring.

use super::Candidate;

/// Keywords that suggest text-heavy, watermarked or collage images.
pub const DEFAULT_BLOCKLIST: [&str; 51] = [
    // text-heavy
    "infographic",
    "template",
    "printable",
    "checklist",
    "worksheet",
    "quote",
    "quotes",
    "tips",
    "tutorial",
    "how to",
    "howto",
    "step by step",
    "guide",
    "cheat sheet",
    "cheatsheet",
    "recipe",
    "ingredients",
    "instructions",
    "diy",
    "download",
    "free",
    "pdf",
    "ebook",
    "chart",
    "diagram",
    "graph",
    "statistics",
    // watermarks and stock
    "logo",
    "watermark",
    "stock",
    "shutterstock",
    "getty",
    "adobe stock",
    "pin this",
    "save this",
    "click",
    "link in bio",
    // grids and collages
    "collage",
    "grid",
    "mood board",
    "moodboard",
    "collection",
    "compilation",
    "roundup",
    "round up",
    "best of",
    "3x3",
    "2x2",
    "4x4",
    "photo dump",
    "photodump",
];

const PIXELS_PER_POINT: f64 = 25_000.0;
const MAX_RESOLUTION_POINTS: f64 = 40.0;
const METADATA_POINTS: f64 = 10.0;
const IDENTITY_POINTS: f64 = 10.0;
const FIRST_KEYWORD_PENALTY: f64 = 50.0;
const EXTRA_KEYWORD_PENALTY: f64 = 15.0;
const MAX_PENALTY: f64 = 100.0;

/// Points awarded per aspect ratio label.
#[derive(Debug, Clone, PartialEq)]
pub struct AspectScores {
    /// `(label, points)` pairs checked in order.
    pub labeled: Vec<(String, f64)>,
    /// Points for an unlabeled candidate taller than it is wide.
    pub unlabeled_portrait: f64,
}

impl Default for AspectScores {
    fn default() -> Self {
        Self {
            labeled: vec![
                ("9:16".to_string(), 30.0),
                ("2:3".to_string(), 25.0),
                ("3:4".to_string(), 25.0),
                ("1:1".to_string(), 15.0),
            ],
            unlabeled_portrait: 20.0,
        }
    }
}

impl AspectScores {
    /// Points for the candidate's aspect ratio.
    #[must_use]
    pub fn points(&self, candidate: &Candidate) -> f64 {
        if let Some((_, points)) = self
            .labeled
            .iter()
            .find(|(label, _)| *label == candidate.aspect_ratio)
        {
            return *points;
        }
        match candidate.dimensions() {
            Some((w, h)) if h > w => self.unlabeled_portrait,
            _ => 0.0,
        }
    }
}

/// `min(40, width * height / 25000)` when both dimensions are known.
#[must_use]
pub fn resolution_points(candidate: &Candidate) -> f64 {
    candidate.dimensions().map_or(0.0, |(w, h)| {
        (f64::from(w) * f64::from(h) / PIXELS_PER_POINT).min(MAX_RESOLUTION_POINTS)
    })
}

/// 10 points each for a title and a description.
#[must_use]
pub fn metadata_points(candidate: &Candidate) -> f64 {
    let mut points = 0.0;
    if candidate.has_title() {
        points += METADATA_POINTS;
    }
    if candidate.has_description() {
        points += METADATA_POINTS;
    }
    points
}

/// 10 points when the candidate carries an id.
#[must_use]
pub fn identity_points(candidate: &Candidate) -> f64 {
    if candidate.has_id() {
        IDENTITY_POINTS
    } else {
        0.0
    }
}

/// Number of distinct blocklist keywords found in title + description.
#[must_use]
pub fn matched_keywords<S: AsRef<str>>(candidate: &Candidate, blocklist: &[S]) -> usize {
    let text = format!(
        "{} {}",
        candidate.title.as_deref().unwrap_or_default(),
        candidate.description.as_deref().unwrap_or_default()
    )
    .to_lowercase();

    blocklist
        .iter()
        .filter(|keyword| text.contains(keyword.as_ref()))
        .count()
}

/// 50 for the first keyword, 15 for each further one, capped at 100.
#[must_use]
pub fn keyword_penalty(matches: usize) -> f64 {
    if matches == 0 {
        return 0.0;
    }
    let extra = u32::try_from(matches - 1).unwrap_or(u32::MAX);
    (FIRST_KEYWORD_PENALTY + EXTRA_KEYWORD_PENALTY * f64::from(extra)).min(MAX_PENALTY)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolution_points_capped() {
        assert_eq!(resolution_points(&Candidate::new("u").with_size(500, 500)), 10.0);
        assert_eq!(resolution_points(&Candidate::new("u").with_size(2000, 2000)), 40.0);
        assert_eq!(resolution_points(&Candidate::new("u")), 0.0);
    }

    #[test]
    fn test_aspect_points() {
        let scores = AspectScores::default();
        assert_eq!(scores.points(&Candidate::new("u").with_aspect_ratio("9:16")), 30.0);
        assert_eq!(scores.points(&Candidate::new("u").with_aspect_ratio("3:4")), 25.0);
        assert_eq!(scores.points(&Candidate::new("u").with_aspect_ratio("1:1")), 15.0);
        assert_eq!(scores.points(&Candidate::new("u").with_size(600, 900)), 20.0);
        assert_eq!(scores.points(&Candidate::new("u").with_size(900, 600)), 0.0);
        assert_eq!(
            scores.points(&Candidate::new("u").with_aspect_ratio("16:9").with_size(600, 900)),
            20.0
        );
    }

    #[test]
    fn test_metadata_and_identity_points() {
        let c = Candidate::new("u").with_title("Sunset").with_id("9");
        assert_eq!(metadata_points(&c), 10.0);
        assert_eq!(identity_points(&c), 10.0);
        assert_eq!(identity_points(&Candidate::new("u")), 0.0);
    }

    #[test]
    fn test_keyword_penalty_schedule() {
        assert_eq!(keyword_penalty(0), 0.0);
        assert_eq!(keyword_penalty(1), 50.0);
        assert_eq!(keyword_penalty(2), 65.0);
        assert_eq!(keyword_penalty(4), 95.0);
        assert_eq!(keyword_penalty(5), 100.0);
        assert_eq!(keyword_penalty(40), 100.0);
    }

    #[test]
    fn test_matched_keywords_case_insensitive_and_distinct() {
        let c = Candidate::new("u")
            .with_title("Free PRINTABLE Checklist")
            .with_description("free download");
        // free, printable, checklist, download
        assert_eq!(matched_keywords(&c, &DEFAULT_BLOCKLIST), 4);

        let clean = Candidate::new("u").with_title("Misty forest at dawn");
        assert_eq!(matched_keywords(&clean, &DEFAULT_BLOCKLIST), 0);
    }
}
