//! Research-log lookup tool.
//!
//! Exposes [`ResearchLog::relevant`] to the model so it can reuse prior
//! answers before reaching for a live search. Results carry the original
//! timestamp and relevance score so the model can judge staleness, and the
//! researcher prompt requires log-sourced claims to be marked
//! "from prior research log".

use super::Tool;
use crate::research_log::{ResearchLog, DEFAULT_MAX_ENTRIES, DEFAULT_MIN_SCORE};
use async_trait::async_trait;
use serde::Deserialize;
use std::sync::Arc;

const MAX_ENTRIES_CAP: usize = 10;

/// Cap on how much of a stored response is replayed to the model.
const MAX_RESPONSE_CHARS: usize = 2000;

#[derive(Debug, Deserialize)]
struct LookupArgs {
    #[serde(default)]
    query: String,
    #[serde(default = "default_max_entries")]
    max_entries: i64,
}

fn default_max_entries() -> i64 {
    DEFAULT_MAX_ENTRIES as i64
}

/// Tool over a shared research log handle.
pub struct LogLookupTool {
    log: Arc<ResearchLog>,
}

impl LogLookupTool {
    pub fn new(log: Arc<ResearchLog>) -> Self {
        Self { log }
    }
}

#[async_trait]
impl Tool for LogLookupTool {
    fn name(&self) -> &str {
        "research_log"
    }

    fn description(&self) -> &str {
        "Look up past research answers relevant to a query. Check this BEFORE searching \
         the web: if a similar question was already answered, reuse it and mark the \
         claim as coming from the prior research log."
    }

    fn parameters(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "query": {
                    "type": "string",
                    "description": "The question to match against past research"
                },
                "max_entries": {
                    "type": "integer",
                    "description": "Maximum number of past entries to return (default 5, max 10)"
                }
            },
            "required": ["query"]
        })
    }

    async fn call(&self, arguments: serde_json::Value) -> String {
        let args: LookupArgs = match serde_json::from_value(arguments) {
            Ok(args) => args,
            Err(e) => return format!("Research log lookup failed: invalid arguments: {}", e),
        };
        if args.query.trim().is_empty() {
            return "Research log lookup failed: empty query".to_string();
        }

        let max_entries = args.max_entries.clamp(1, MAX_ENTRIES_CAP as i64) as usize;
        let entries = self.log.relevant(&args.query, DEFAULT_MIN_SCORE, max_entries);

        if entries.is_empty() {
            return format!("No prior research found for: {}", args.query);
        }

        entries
            .iter()
            .enumerate()
            .map(|(i, entry)| {
                let mut response = entry.response.clone();
                if response.len() > MAX_RESPONSE_CHARS {
                    // Truncate on a char boundary.
                    let cut = response
                        .char_indices()
                        .take_while(|(idx, _)| *idx < MAX_RESPONSE_CHARS)
                        .last()
                        .map(|(idx, c)| idx + c.len_utf8())
                        .unwrap_or(0);
                    response.truncate(cut);
                    response.push_str("... [truncated]");
                }
                format!(
                    "[{}] Previously asked: {}\n    When: {} (relevance {:.2})\n    Answer: {}",
                    i + 1,
                    entry.query,
                    entry.timestamp,
                    entry.relevance_score.unwrap_or(0.0),
                    response
                )
            })
            .collect::<Vec<_>>()
            .join("\n\n")
    }
}
