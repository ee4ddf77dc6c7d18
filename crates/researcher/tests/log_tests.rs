//! Research log property tests through the public API.

use researcher::research_log::relevance_score;
use researcher::{ResearchLog, LogEntry};
use tempfile::TempDir;

// ============================================================================
// Scoring properties
// ============================================================================

#[test]
fn test_score_is_deterministic_and_reflexive() {
    for query in ["capital of France", "weather oslo", "rust async"] {
        assert_eq!(relevance_score(query, query), 1.0);
        assert_eq!(
            relevance_score(query, "unrelated topic entirely"),
            relevance_score(query, "unrelated topic entirely")
        );
    }
    assert_eq!(relevance_score("", "anything at all"), 0.0);
}

#[test]
fn test_containment_scores_point_nine() {
    let pairs = [
        ("capital of France", "What is the capital of France?"),
        ("weather in Oslo", "weather in oslo right now and this weekend"),
        ("the rust borrow checker explained", "borrow checker"),
    ];
    for (query, logged) in pairs {
        assert_eq!(relevance_score(query, logged), 0.9, "{} / {}", query, logged);
    }
}

#[test]
fn test_scores_stay_in_unit_interval() {
    let queries = ["a", "capital of France", "how why what", "x y z w v u"];
    let logged = ["", "capital", "France capital city Paris Europe", "completely different"];
    for q in queries {
        for l in logged {
            let score = relevance_score(q, l);
            assert!((0.0..=1.0).contains(&score), "score({q:?}, {l:?}) = {score}");
        }
    }
}

// ============================================================================
// Store behavior
// ============================================================================

#[test]
fn test_file_roundtrip_matches_documented_shape() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("research_log.json");
    let log = ResearchLog::file(&path);

    log.append("capital of France", "Paris.", 1.234, None).unwrap();

    let entries = log.load();
    assert_eq!(entries.len(), 1);
    let entry = &entries[0];
    assert_eq!(entry.query, "capital of France");
    assert_eq!(entry.response, "Paris.");
    assert_eq!(entry.response_time_seconds, 1.23);

    // The file itself is a JSON array with the documented keys and no
    // relevance_score.
    let raw = std::fs::read_to_string(&path).unwrap();
    let parsed: serde_json::Value = serde_json::from_str(&raw).unwrap();
    assert!(parsed.is_array());
    assert!(parsed[0]["timestamp"].is_string());
    assert!(parsed[0].get("relevance_score").is_none());
}

#[test]
fn test_load_never_raises() {
    let dir = TempDir::new().unwrap();

    let missing = ResearchLog::file(dir.path().join("nope.json"));
    assert!(missing.load().is_empty());

    let empty_path = dir.path().join("empty.json");
    std::fs::write(&empty_path, "").unwrap();
    assert!(ResearchLog::file(&empty_path).load().is_empty());

    let garbage_path = dir.path().join("garbage.json");
    std::fs::write(&garbage_path, "not json").unwrap();
    assert!(ResearchLog::file(&garbage_path).load().is_empty());
}

#[test]
fn test_relevant_returns_only_matching_entries_sorted() {
    let log = ResearchLog::in_memory();

    // Three entries that should match a "capital of France" probe...
    log.append("capital of France", "exact", 0.1, Some("2024-01-05T00:00:00+00:00".into()))
        .unwrap();
    log.append(
        "what is the capital of France today",
        "containment",
        0.1,
        Some("2024-01-02T00:00:00+00:00".into()),
    )
    .unwrap();
    log.append(
        "France capital city history",
        "overlap",
        0.1,
        Some("2024-01-03T00:00:00+00:00".into()),
    )
    .unwrap();
    // ...and seven that should not.
    for i in 0..7 {
        log.append(
            &format!("unrelated question number {}", i),
            "noise",
            0.1,
            Some(format!("2024-02-0{}T00:00:00+00:00", i + 1)),
        )
        .unwrap();
    }

    let hits = log.relevant("capital of France", 0.4, 5);
    let responses: Vec<&str> = hits.iter().map(|e| e.response.as_str()).collect();
    assert_eq!(responses, vec!["exact", "containment", "overlap"]);

    // Scores descend and are annotated on every hit.
    let scores: Vec<f64> = hits.iter().map(|e| e.relevance_score.unwrap()).collect();
    assert_eq!(scores[0], 1.0);
    assert_eq!(scores[1], 0.9);
    assert!(scores[2] >= 0.4 && scores[2] < 0.9);
}

#[test]
fn test_append_order_is_identity() {
    let log = ResearchLog::in_memory();
    for i in 0..5 {
        log.append(&format!("q{}", i), &format!("r{}", i), 0.0, None).unwrap();
    }
    let entries: Vec<LogEntry> = log.load();
    for (i, entry) in entries.iter().enumerate() {
        assert_eq!(entry.query, format!("q{}", i));
    }
}
