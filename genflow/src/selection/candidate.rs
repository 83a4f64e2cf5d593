//! Candidate records fed to the selection engine.

use serde::{Deserialize, Serialize};

/// A scraped image candidate.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Candidate {
    /// Provider-side identifier.
    #[serde(default)]
    pub id: Option<String>,
    /// Image URL; the identity key for dedup.
    #[serde(default, alias = "image_url")]
    pub url: Option<String>,
    /// Title text.
    #[serde(default)]
    pub title: Option<String>,
    /// Description text.
    #[serde(default)]
    pub description: Option<String>,
    /// Width in pixels.
    #[serde(default, alias = "image_width")]
    pub width: Option<u32>,
    /// Height in pixels.
    #[serde(default, alias = "image_height")]
    pub height: Option<u32>,
    /// Aspect ratio label such as "9:16"; may be empty.
    #[serde(default)]
    pub aspect_ratio: String,
}

impl Candidate {
    /// Creates a candidate with a URL and nothing else.
    #[must_use]
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: Some(url.into()),
            ..Self::default()
        }
    }

    /// Sets the identifier.
    #[must_use]
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Sets the title.
    #[must_use]
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    /// Sets the description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Sets the pixel dimensions.
    #[must_use]
    pub fn with_size(mut self, width: u32, height: u32) -> Self {
        self.width = Some(width);
        self.height = Some(height);
        self
    }

    /// Sets the aspect ratio label.
    #[must_use]
    pub fn with_aspect_ratio(mut self, aspect_ratio: impl Into<String>) -> Self {
        self.aspect_ratio = aspect_ratio.into();
        self
    }

    /// Returns the URL if present and non-empty.
    #[must_use]
    pub fn url(&self) -> Option<&str> {
        non_empty(self.url.as_deref())
    }

    /// Returns both dimensions when both are known and non-zero.
    #[must_use]
    pub fn dimensions(&self) -> Option<(u32, u32)> {
        match (self.width, self.height) {
            (Some(w), Some(h)) if w > 0 && h > 0 => Some((w, h)),
            _ => None,
        }
    }

    /// Returns true if the id is present and non-empty.
    #[must_use]
    pub fn has_id(&self) -> bool {
        non_empty(self.id.as_deref()).is_some()
    }

    /// Returns true if the title is present and non-empty.
    #[must_use]
    pub fn has_title(&self) -> bool {
        non_empty(self.title.as_deref()).is_some()
    }

    /// Returns true if the description is present and non-empty.
    #[must_use]
    pub fn has_description(&self) -> bool {
        non_empty(self.description.as_deref()).is_some()
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.is_empty())
}

/// A candidate with its computed score and fingerprint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredCandidate {
    /// The candidate.
    pub candidate: Candidate,
    /// Quality score; negative for heavily penalized candidates.
    pub score: f64,
    /// Hex fingerprint used for diversity checks.
    pub fingerprint: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_scraper_field_names() {
        let candidate: Candidate = serde_json::from_str(
            r#"{"id": "123", "image_url": "https://i.pinimg.com/a.jpg", "image_width": 736, "image_height": 1308, "aspect_ratio": "9:16"}"#,
        )
        .unwrap();
        assert_eq!(candidate.url(), Some("https://i.pinimg.com/a.jpg"));
        assert_eq!(candidate.dimensions(), Some((736, 1308)));
        assert!(candidate.has_id());
        assert!(!candidate.has_title());
    }

    #[test]
    fn test_empty_fields_count_as_missing() {
        let candidate = Candidate {
            id: Some(String::new()),
            url: Some(String::new()),
            title: Some(String::new()),
            width: Some(0),
            height: Some(100),
            ..Candidate::default()
        };
        assert!(candidate.url().is_none());
        assert!(candidate.dimensions().is_none());
        assert!(!candidate.has_id());
        assert!(!candidate.has_title());
    }
}
