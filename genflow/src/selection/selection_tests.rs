//! Selection engine behaviour over realistic candidate pools.

use pretty_assertions::assert_eq;

use super::*;

fn scored(name: &str, points: u32) -> Candidate {
    // Portrait, so every candidate gets the same aspect bonus; width drives
    // the resolution component to exactly `points`.
    Candidate::new(format!("https://img.test/pins/{name}.jpg"))
        .with_id(name)
        .with_size(25 * points, 1000)
}

fn names(candidates: &[Candidate]) -> Vec<String> {
    candidates
        .iter()
        .map(|c| c.id.clone().unwrap_or_default())
        .collect()
}

fn exact_fingerprint_engine() -> SelectionEngine {
    SelectionEngine::with_config(SelectionConfig::default().with_diversity_prefix_len(8))
}

#[test]
fn test_selection_is_deterministic_and_stable_on_ties() {
    let input = vec![
        scored("c11", 1),
        scored("tie_first", 9),
        scored("c0", 12),
        scored("c9", 3),
        scored("c5", 7),
        scored("tie_second", 9),
        scored("c1", 11),
        scored("c10", 2),
        scored("c2", 10),
        scored("c6", 6),
        scored("c8", 4),
        scored("c7", 5),
    ];
    let engine = exact_fingerprint_engine();

    let first = engine.select(&input, 12);
    let second = engine.select(&input, 12);

    assert_eq!(first, second);
    assert_eq!(
        names(&first),
        vec![
            "c0",
            "c1",
            "c2",
            "tie_first",
            "tie_second",
            "c5",
            "c6",
            "c7",
            "c8",
            "c9",
            "c10",
            "c11"
        ]
    );

    let default_engine = SelectionEngine::new();
    let first = default_engine.select(&input, 12);
    assert!(!first.is_empty());
    assert_eq!(first, default_engine.select(&input, 12));
    assert_eq!(names(&first)[0], "c0");
}

#[test]
fn test_dedup_keeps_first_occurrence_per_url() {
    let shared = "https://img.test/pins/shared.jpg";
    let mut input: Vec<Candidate> = (0..5)
        .map(|i| Candidate::new(shared).with_id(format!("dup{i}")))
        .collect();
    input.extend((0..3).map(|i| Candidate::new(format!("https://img.test/pins/{i}.jpg"))));
    input.push(Candidate::default().with_id("no-url"));
    input.push(Candidate::new("").with_id("empty-url"));

    let engine = SelectionEngine::new();
    let unique = engine.dedup(&input);

    assert_eq!(unique.len(), 4);
    assert_eq!(unique[0].id.as_deref(), Some("dup0"));

    let (_, report) = exact_fingerprint_engine().select_scored(&input, 25);
    assert_eq!(report.input, 10);
    assert_eq!(report.unique, 4);
}

#[test]
fn test_near_duplicates_across_hosts_select_one() {
    let input = vec![
        Candidate::new("https://i.pinimg.com/736x/ab/cd/sunset.jpg")
            .with_id("pinimg")
            .with_size(736, 1308),
        Candidate::new("https://mirror.cdn.net/ab/cd/sunset.jpg")
            .with_id("mirror")
            .with_size(736, 1308),
    ];
    let engine = SelectionEngine::new();

    let (selected, report) = engine.select_scored(&input, 10);

    assert_eq!(selected.len(), 1);
    assert_eq!(selected[0].candidate.id.as_deref(), Some("pinimg"));
    assert_eq!(report.skipped_similar, 1);
}

#[test]
fn test_k_caps_output_and_small_pools_return_fewer() {
    let input: Vec<Candidate> = (1..=6).map(|i| scored(&format!("p{i}"), i)).collect();
    let engine = exact_fingerprint_engine();

    assert_eq!(engine.select(&input, 3).len(), 3);
    assert_eq!(engine.select(&input, 50).len(), 6);
}

#[test]
fn test_penalized_candidates_sink_to_the_bottom() {
    let input = vec![
        scored("clean_low", 1),
        scored("infographic", 40)
            .with_title("Skincare infographic")
            .with_description("free printable checklist"),
    ];
    let engine = exact_fingerprint_engine();

    let (selected, report) = engine.select_scored(&input, 10);

    assert_eq!(
        selected
            .iter()
            .map(|s| s.candidate.id.clone().unwrap_or_default())
            .collect::<Vec<_>>(),
        vec!["clean_low", "infographic"]
    );
    assert_eq!(report.penalized, 1);
    assert!(report.min_score.unwrap_or_default() < 0.0);
    assert_eq!(selected[0].fingerprint.len(), 8);
}
