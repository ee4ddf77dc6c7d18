//! Research log - durable record of past questions and answers.
//!
//! The log is a whole-file JSON array on disk (load-all / write-all, not
//! streaming). Reads fail soft: a missing, unreadable or malformed file is an
//! empty log, never an error, so a broken log can never take down a research
//! run. Writes go through a temp file and an atomic rename so a partial write
//! cannot corrupt existing entries.
//!
//! Besides persistence the log answers the question "have I researched
//! something like this before": [`ResearchLog::relevant`] scores stored
//! queries against a new one and returns the closest matches.
//!
//! Known limitation: load-all/write-all means two overlapping runs can lose
//! an update. Acceptable for a single-user tool; multi-user deployments need
//! a file lock or a single-writer queue in front of the store.

use anyhow::{Context, Result};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::{debug, warn};

/// Minimum relevance score for an entry to count as a match.
pub const DEFAULT_MIN_SCORE: f64 = 0.4;

/// Maximum number of relevant entries returned per lookup.
pub const DEFAULT_MAX_ENTRIES: usize = 5;

/// Filler words ignored when comparing queries by word overlap.
const STOP_WORDS: [&str; 11] = [
    "a", "an", "the", "is", "are", "what", "how", "when", "where", "why", "who",
];

/// One question/answer record.
///
/// `relevance_score` is only populated on entries returned from
/// [`ResearchLog::relevant`]; it is never persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    pub query: String,
    pub response: String,
    /// RFC 3339 timestamp (UTC).
    pub timestamp: String,
    /// Wall-clock time for the run that produced the response, rounded to 2
    /// decimals.
    pub response_time_seconds: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub relevance_score: Option<f64>,
}

/// Storage behind a [`ResearchLog`].
///
/// `load` returns `None` when the store is absent or unreadable - the log
/// treats that as empty. `persist` replaces the full entry list.
pub trait LogBackend: Send + Sync {
    fn load(&self) -> Option<Vec<LogEntry>>;
    fn persist(&self, entries: &[LogEntry]) -> Result<()>;
}

/// File-backed store: one pretty-printed JSON array, rewritten atomically.
pub struct FileBackend {
    path: PathBuf,
}

impl FileBackend {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl LogBackend for FileBackend {
    fn load(&self) -> Option<Vec<LogEntry>> {
        if !self.path.exists() {
            return None;
        }
        let raw = match std::fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) => {
                warn!("Research log unreadable at {:?}: {}", self.path, e);
                return None;
            }
        };
        match serde_json::from_str::<Vec<LogEntry>>(&raw) {
            Ok(entries) => Some(entries),
            Err(e) => {
                warn!("Research log malformed at {:?}: {}", self.path, e);
                None
            }
        }
    }

    fn persist(&self, entries: &[LogEntry]) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("Failed to create log directory: {:?}", parent))?;
            }
        }

        // serde_json writes UTF-8 without escaping non-ASCII, which keeps the
        // file readable for humans grepping their own history.
        let json = serde_json::to_string_pretty(entries)
            .context("Failed to serialize research log")?;

        // Temp file + rename so a crash mid-write leaves the old log intact.
        let tmp_path = self.path.with_extension("json.tmp");
        std::fs::write(&tmp_path, json)
            .with_context(|| format!("Failed to write research log: {:?}", tmp_path))?;
        std::fs::rename(&tmp_path, &self.path)
            .with_context(|| format!("Failed to replace research log: {:?}", self.path))?;

        debug!("Research log persisted ({} entries)", entries.len());
        Ok(())
    }
}

/// In-memory store for tests and ephemeral sessions.
#[derive(Default)]
pub struct MemoryBackend {
    entries: Mutex<Vec<LogEntry>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }
}

impl LogBackend for MemoryBackend {
    fn load(&self) -> Option<Vec<LogEntry>> {
        Some(self.entries.lock().unwrap().clone())
    }

    fn persist(&self, entries: &[LogEntry]) -> Result<()> {
        *self.entries.lock().unwrap() = entries.to_vec();
        Ok(())
    }
}

/// The research log store.
pub struct ResearchLog {
    backend: Box<dyn LogBackend>,
}

impl ResearchLog {
    /// File-backed log at the given path.
    pub fn file<P: AsRef<Path>>(path: P) -> Self {
        Self {
            backend: Box::new(FileBackend::new(path)),
        }
    }

    /// In-memory log (nothing touches disk).
    pub fn in_memory() -> Self {
        Self {
            backend: Box::new(MemoryBackend::new()),
        }
    }

    /// Log over a caller-supplied backend.
    pub fn with_backend(backend: Box<dyn LogBackend>) -> Self {
        Self { backend }
    }

    /// All entries in append order. Empty on any read problem.
    pub fn load(&self) -> Vec<LogEntry> {
        self.backend.load().unwrap_or_default()
    }

    /// Append one entry and rewrite the store.
    ///
    /// `timestamp` defaults to now (UTC). The caller decides what an `Err`
    /// means; the pipeline treats logging as best-effort and only warns.
    pub fn append(
        &self,
        query: &str,
        response: &str,
        response_time_seconds: f64,
        timestamp: Option<String>,
    ) -> Result<()> {
        let mut entries = self.load();
        entries.push(LogEntry {
            query: query.to_string(),
            response: response.to_string(),
            timestamp: timestamp.unwrap_or_else(|| Utc::now().to_rfc3339()),
            response_time_seconds: round2(response_time_seconds),
            relevance_score: None,
        });
        self.backend.persist(&entries)
    }

    /// Past entries relevant to `query`, best first.
    ///
    /// Entries scoring at least `min_score` are annotated with their score
    /// (rounded to 2 decimals), sorted by descending score then ascending
    /// timestamp, and truncated to `max_entries`.
    pub fn relevant(&self, query: &str, min_score: f64, max_entries: usize) -> Vec<LogEntry> {
        if query.trim().is_empty() {
            return Vec::new();
        }

        let mut scored: Vec<LogEntry> = self
            .load()
            .into_iter()
            .filter_map(|mut entry| {
                let score = round2(relevance_score(query, &entry.query));
                if score >= min_score {
                    entry.relevance_score = Some(score);
                    Some(entry)
                } else {
                    None
                }
            })
            .collect();

        scored.sort_by(|a, b| {
            let sa = a.relevance_score.unwrap_or(0.0);
            let sb = b.relevance_score.unwrap_or(0.0);
            sb.partial_cmp(&sa)
                .unwrap_or(Ordering::Equal)
                .then_with(|| a.timestamp.cmp(&b.timestamp))
        });

        scored.truncate(max_entries);
        scored
    }
}

/// Round to 2 decimals (log file and score precision).
fn round2(x: f64) -> f64 {
    (x * 100.0).round() / 100.0
}

/// Lowercase, strip punctuation, collapse whitespace.
fn normalize(s: &str) -> String {
    let lowered = s.to_lowercase();
    let cleaned: String = lowered
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || c == '_' || c.is_whitespace() {
                c
            } else {
                ' '
            }
        })
        .collect();
    cleaned.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Normalized word set with stop words removed.
fn word_set(s: &str) -> HashSet<String> {
    normalize(s)
        .split_whitespace()
        .filter(|w| !STOP_WORDS.contains(w))
        .map(|w| w.to_string())
        .collect()
}

/// Score how well a logged query matches a new one, 0-1.
///
/// 1.0 = exact normalized match, 0.9 = substring containment either way,
/// otherwise stop-word-filtered word overlap normalized by the *query's*
/// word count with a 1.2 boost, capped at 1.0. The asymmetric normalization
/// is deliberate: a query fully covered by a longer logged entry still scores
/// high, which biases the "have I answered this before" check toward recall.
pub fn relevance_score(query: &str, logged_query: &str) -> f64 {
    let nq = normalize(query);
    let nlogged = normalize(logged_query);

    if nq.is_empty() {
        return 0.0;
    }
    if nq == nlogged {
        return 1.0;
    }
    if nlogged.contains(&nq) || nq.contains(&nlogged) {
        return 0.9;
    }

    let q_words = word_set(query);
    let log_words = word_set(logged_query);
    if q_words.is_empty() {
        return 0.0;
    }

    let overlap = q_words.intersection(&log_words).count() as f64 / q_words.len() as f64;
    (overlap * 1.2).min(1.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_normalize() {
        assert_eq!(normalize("  What's the CAPITAL, of France?! "), "what s the capital of france");
        assert_eq!(normalize(""), "");
        assert_eq!(normalize("?!.,"), "");
    }

    #[test]
    fn test_word_set_drops_stop_words() {
        let words = word_set("What is the capital of France");
        assert!(words.contains("capital"));
        assert!(words.contains("france"));
        assert!(!words.contains("what"));
        assert!(!words.contains("the"));
    }

    #[test]
    fn test_score_identity_and_empty() {
        assert_eq!(relevance_score("rust async runtimes", "rust async runtimes"), 1.0);
        assert_eq!(relevance_score("Rust Async Runtimes?", "rust async runtimes"), 1.0);
        assert_eq!(relevance_score("", "anything"), 0.0);
        assert_eq!(relevance_score("   ", "anything"), 0.0);
    }

    #[test]
    fn test_score_containment() {
        assert_eq!(relevance_score("capital of France", "what was the capital of france in 1800"), 0.9);
        assert_eq!(relevance_score("the weather in Oslo today", "weather in oslo"), 0.9);
    }

    #[test]
    fn test_score_word_overlap_bounds() {
        let score = relevance_score("rust borrow checker errors", "common borrow checker patterns");
        assert!(score > 0.0 && score <= 1.0);

        // Full coverage of the query's words caps at 1.0 even with the boost.
        let score = relevance_score("borrow checker", "checker borrow explained at length");
        assert_eq!(score, 1.0);
    }

    #[test]
    fn test_score_monotonic_in_overlap() {
        let query = "rust tokio channels tutorial";
        let one = relevance_score(query, "tokio internals");
        let two = relevance_score(query, "tokio channels internals");
        let three = relevance_score(query, "rust tokio channels deep dive");
        assert!(one <= two);
        assert!(two <= three);
    }

    #[test]
    fn test_score_all_stop_words_query() {
        // Not identical, not a substring, and nothing left after stop-word
        // removal: the overlap branch must yield 0.
        assert_eq!(relevance_score("what is the", "who are an the what bar"), 0.0);
    }

    #[test]
    fn test_append_and_load_roundtrip() {
        let dir = TempDir::new().unwrap();
        let log = ResearchLog::file(dir.path().join("research_log.json"));

        log.append("q1", "r1", 1.234, None).unwrap();
        log.append("q2", "r2", 0.5, Some("2024-01-01T00:00:00+00:00".to_string()))
            .unwrap();

        let entries = log.load();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].query, "q1");
        assert_eq!(entries[0].response_time_seconds, 1.23);
        assert!(entries[0].relevance_score.is_none());
        assert_eq!(entries[1].timestamp, "2024-01-01T00:00:00+00:00");
    }

    #[test]
    fn test_load_fails_soft() {
        let dir = TempDir::new().unwrap();

        // Missing file.
        let log = ResearchLog::file(dir.path().join("missing.json"));
        assert!(log.load().is_empty());

        // Empty file.
        let empty = dir.path().join("empty.json");
        std::fs::write(&empty, "").unwrap();
        assert!(ResearchLog::file(&empty).load().is_empty());

        // Garbage.
        let garbage = dir.path().join("garbage.json");
        std::fs::write(&garbage, "not json").unwrap();
        assert!(ResearchLog::file(&garbage).load().is_empty());

        // JSON, but not an array of entries.
        let object = dir.path().join("object.json");
        std::fs::write(&object, "{\"query\": \"q\"}").unwrap();
        assert!(ResearchLog::file(&object).load().is_empty());
    }

    #[test]
    fn test_append_creates_parent_dirs() {
        let dir = TempDir::new().unwrap();
        let nested = dir.path().join("state").join("deep").join("log.json");
        let log = ResearchLog::file(&nested);

        log.append("q", "r", 0.1, None).unwrap();
        assert!(nested.exists());
        assert_eq!(log.load().len(), 1);
    }

    #[test]
    fn test_append_preserves_non_ascii() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("log.json");
        let log = ResearchLog::file(&path);

        log.append("Hauptstadt von Österreich", "Wien ist die Hauptstadt.", 0.2, None)
            .unwrap();

        let raw = std::fs::read_to_string(&path).unwrap();
        assert!(raw.contains("Österreich"));
        assert!(raw.contains("Wien"));
    }

    #[test]
    fn test_relevant_filters_and_sorts() {
        let log = ResearchLog::in_memory();
        log.append("capital of France", "Paris", 0.1, Some("2024-01-03T00:00:00+00:00".into()))
            .unwrap();
        log.append("capital of france", "Paris again", 0.1, Some("2024-01-01T00:00:00+00:00".into()))
            .unwrap();
        log.append("rust borrow checker", "explained", 0.1, Some("2024-01-02T00:00:00+00:00".into()))
            .unwrap();

        let hits = log.relevant("capital of France", DEFAULT_MIN_SCORE, DEFAULT_MAX_ENTRIES);
        assert_eq!(hits.len(), 2);
        // Both exact matches score 1.0; the tie breaks on ascending timestamp.
        assert_eq!(hits[0].response, "Paris again");
        assert_eq!(hits[0].relevance_score, Some(1.0));
        assert_eq!(hits[1].response, "Paris");
    }

    #[test]
    fn test_relevant_truncates() {
        let log = ResearchLog::in_memory();
        for i in 0..10 {
            log.append("capital of France", &format!("r{}", i), 0.1, None)
                .unwrap();
        }
        let hits = log.relevant("capital of France", DEFAULT_MIN_SCORE, 5);
        assert_eq!(hits.len(), 5);
    }

    #[test]
    fn test_relevant_empty_query() {
        let log = ResearchLog::in_memory();
        log.append("q", "r", 0.1, None).unwrap();
        assert!(log.relevant("", DEFAULT_MIN_SCORE, DEFAULT_MAX_ENTRIES).is_empty());
    }
}
