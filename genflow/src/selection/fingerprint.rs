//! Near-duplicate fingerprints.
//!
//! Two candidates whose URLs end in the same path segments and share
//! dimensions hash to the same fingerprint, regardless of CDN host.

use md5::{Digest, Md5};

use super::Candidate;

/// Computes a short hex fingerprint from URL tail segments and dimensions.
#[must_use]
pub fn fingerprint(candidate: &Candidate, url_segments: usize, length: usize) -> String {
    let url = candidate.url().unwrap_or_default();
    let parts: Vec<&str> = url.split('/').collect();
    let tail = &parts[parts.len().saturating_sub(url_segments)..];

    let input = format!(
        "{}:{}:{}",
        tail.join("-"),
        candidate.width.unwrap_or(0),
        candidate.height.unwrap_or(0)
    );

    let mut digest = hex::encode(Md5::digest(input.as_bytes()));
    digest.truncate(length);
    digest
}

/// Returns true if `candidate` shares its first `prefix_len` chars with any
/// already-selected fingerprint.
#[must_use]
pub fn is_too_similar(candidate: &str, selected: &[String], prefix_len: usize) -> bool {
    let prefix = prefix_of(candidate, prefix_len);
    selected
        .iter()
        .any(|existing| prefix_of(existing, prefix_len) == prefix)
}

fn prefix_of(fingerprint: &str, len: usize) -> &str {
    fingerprint.get(..len).unwrap_or(fingerprint)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fingerprint_ignores_host() {
        let a = Candidate::new("https://i.pinimg.com/736x/ab/cd/photo.jpg").with_size(736, 1308);
        let b = Candidate::new("https://cdn.example.org/ab/cd/photo.jpg").with_size(736, 1308);
        assert_eq!(fingerprint(&a, 3, 8), fingerprint(&b, 3, 8));
        assert_eq!(fingerprint(&a, 3, 8).len(), 8);
    }

    #[test]
    fn test_fingerprint_depends_on_dimensions() {
        let a = Candidate::new("https://x/ab/cd/photo.jpg").with_size(736, 1308);
        let b = Candidate::new("https://x/ab/cd/photo.jpg").with_size(1080, 1920);
        assert_ne!(fingerprint(&a, 3, 8), fingerprint(&b, 3, 8));
    }

    #[test]
    fn test_fingerprint_matches_md5_of_tail() {
        // md5("a-b-c.jpg:0:0")
        let c = Candidate::new("https://host/a/b/c.jpg");
        let expected = hex::encode(Md5::digest(b"a-b-c.jpg:0:0"));
        assert_eq!(fingerprint(&c, 3, 8), expected[..8]);
    }

    #[test]
    fn test_similarity_uses_prefix() {
        let selected = vec!["abcd1234".to_string(), "ffff0000".to_string()];
        assert!(is_too_similar("abcd9999", &selected, 4));
        assert!(!is_too_similar("abce1234", &selected, 4));
        assert!(!is_too_similar("abcd9999", &selected, 8));
        assert!(!is_too_similar("abcd9999", &[], 4));
    }
}
