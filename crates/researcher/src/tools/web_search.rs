//! DuckDuckGo search tools.
//!
//! Scrapes the HTML results endpoint (no API key required) and formats hits
//! as numbered blocks with title, URL and snippet - the shape the researcher
//! prompt teaches the model to cite from. `search_news` is the same backend
//! with a past-week freshness filter for time-sensitive topics.

use super::Tool;
use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

const DDG_HTML_URL: &str = "https://html.duckduckgo.com/html/";

/// Per-call timeout. One slow search must not stall the whole run.
const SEARCH_TIMEOUT_SECS: u64 = 10;

/// Hard ceiling on results per search.
const MAX_RESULTS_CAP: usize = 20;

const DEFAULT_MAX_RESULTS: usize = 8;

/// Search tool errors (internal; always rendered to a string at the boundary).
#[derive(Debug, thiserror::Error)]
enum SearchError {
    #[error("network error: {0}")]
    Network(String),

    #[error("parse error: {0}")]
    Parse(String),
}

#[derive(Debug, Deserialize)]
struct SearchArgs {
    #[serde(default)]
    query: String,
    #[serde(default = "default_max_results")]
    max_results: i64,
}

fn default_max_results() -> i64 {
    DEFAULT_MAX_RESULTS as i64
}

impl SearchArgs {
    fn clamped_max(&self) -> usize {
        self.max_results.clamp(1, MAX_RESULTS_CAP as i64) as usize
    }
}

#[derive(Debug)]
struct SearchHit {
    title: String,
    url: String,
    snippet: String,
}

fn search_http_client() -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(SEARCH_TIMEOUT_SECS))
        .user_agent("researcher-bot/0.1 (research assistant)")
        .build()
        .unwrap_or_default()
}

/// Fetch and parse DuckDuckGo HTML results.
///
/// `freshness` is DuckDuckGo's `df` parameter ("d", "w", "m").
async fn ddg_search(
    http: &reqwest::Client,
    query: &str,
    max_results: usize,
    freshness: Option<&str>,
) -> Result<Vec<SearchHit>, SearchError> {
    let mut params = vec![("q", query.to_string())];
    if let Some(df) = freshness {
        params.push(("df", df.to_string()));
    }

    debug!("DuckDuckGo search: {:?} (freshness {:?})", query, freshness);

    let response = http
        .get(DDG_HTML_URL)
        .query(&params)
        .send()
        .await
        .map_err(|e| SearchError::Network(e.to_string()))?;

    if !response.status().is_success() {
        return Err(SearchError::Network(format!("HTTP {}", response.status())));
    }

    let html = response
        .text()
        .await
        .map_err(|e| SearchError::Network(e.to_string()))?;

    parse_results(&html, max_results)
}

fn parse_results(html: &str, max_results: usize) -> Result<Vec<SearchHit>, SearchError> {
    use scraper::{Html, Selector};

    let document = Html::parse_document(html);
    let result_selector =
        Selector::parse("div.result").map_err(|e| SearchError::Parse(e.to_string()))?;
    let title_selector =
        Selector::parse("a.result__a").map_err(|e| SearchError::Parse(e.to_string()))?;
    let snippet_selector =
        Selector::parse(".result__snippet").map_err(|e| SearchError::Parse(e.to_string()))?;

    let mut hits = Vec::new();
    for result in document.select(&result_selector) {
        let Some(anchor) = result.select(&title_selector).next() else {
            continue;
        };
        let title = collapse_whitespace(&anchor.text().collect::<String>());
        let url = anchor
            .value()
            .attr("href")
            .map(resolve_redirect)
            .unwrap_or_default();
        let snippet = result
            .select(&snippet_selector)
            .next()
            .map(|s| collapse_whitespace(&s.text().collect::<String>()))
            .unwrap_or_default();

        if title.is_empty() && url.is_empty() {
            continue;
        }
        hits.push(SearchHit { title, url, snippet });
        if hits.len() >= max_results {
            break;
        }
    }

    Ok(hits)
}

/// DuckDuckGo wraps result links in a redirect
/// (`//duckduckgo.com/l/?uddg=<encoded>&rut=...`); unwrap to the real URL.
fn resolve_redirect(href: &str) -> String {
    if let Some(idx) = href.find("uddg=") {
        let encoded = &href[idx + 5..];
        let encoded = encoded.split('&').next().unwrap_or(encoded);
        if let Ok(decoded) = urlencoding::decode(encoded) {
            return decoded.into_owned();
        }
    }
    href.to_string()
}

fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn render_results(hits: &[SearchHit], query: &str) -> String {
    if hits.is_empty() {
        return format!("No results found for: {}", query);
    }
    hits.iter()
        .enumerate()
        .map(|(i, hit)| {
            format!(
                "[{}] {}\n    URL: {}\n    {}",
                i + 1,
                hit.title,
                hit.url,
                hit.snippet
            )
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

fn parse_args(arguments: serde_json::Value) -> Result<SearchArgs, String> {
    serde_json::from_value::<SearchArgs>(arguments).map_err(|e| format!("invalid arguments: {}", e))
}

// ============================================================================
// search_web
// ============================================================================

/// General web search via DuckDuckGo.
pub struct SearchWebTool {
    http: reqwest::Client,
}

impl SearchWebTool {
    pub fn new() -> Self {
        Self {
            http: search_http_client(),
        }
    }
}

impl Default for SearchWebTool {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Tool for SearchWebTool {
    fn name(&self) -> &str {
        "search_web"
    }

    fn description(&self) -> &str {
        "Search the internet using DuckDuckGo. Use this to find current information, \
         news, facts, or research on any topic. Returns numbered results with titles, \
         URLs, and snippets."
    }

    fn parameters(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "query": {
                    "type": "string",
                    "description": "The search query - be specific and descriptive for better results"
                },
                "max_results": {
                    "type": "integer",
                    "description": "Maximum number of results to return (default 8, max 20)"
                }
            },
            "required": ["query"]
        })
    }

    async fn call(&self, arguments: serde_json::Value) -> String {
        let args = match parse_args(arguments) {
            Ok(args) => args,
            Err(e) => return format!("DuckDuckGo search failed: {}", e),
        };
        if args.query.trim().is_empty() {
            return "DuckDuckGo search failed: empty query".to_string();
        }
        match ddg_search(&self.http, &args.query, args.clamped_max(), None).await {
            Ok(hits) => render_results(&hits, &args.query),
            Err(e) => format!("DuckDuckGo search failed: {}", e),
        }
    }
}

// ============================================================================
// search_news
// ============================================================================

/// Freshness-filtered search (past week) for current events.
pub struct SearchNewsTool {
    http: reqwest::Client,
}

impl SearchNewsTool {
    pub fn new() -> Self {
        Self {
            http: search_http_client(),
        }
    }
}

impl Default for SearchNewsTool {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Tool for SearchNewsTool {
    fn name(&self) -> &str {
        "search_news"
    }

    fn description(&self) -> &str {
        "Search recent news and current events (results from the past week). Use this \
         for weather, prices, breaking news, or anything time-sensitive."
    }

    fn parameters(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "query": {
                    "type": "string",
                    "description": "The news search query"
                },
                "max_results": {
                    "type": "integer",
                    "description": "Maximum number of results to return (default 8, max 20)"
                }
            },
            "required": ["query"]
        })
    }

    async fn call(&self, arguments: serde_json::Value) -> String {
        let args = match parse_args(arguments) {
            Ok(args) => args,
            Err(e) => return format!("DuckDuckGo news search failed: {}", e),
        };
        if args.query.trim().is_empty() {
            return "DuckDuckGo news search failed: empty query".to_string();
        }
        match ddg_search(&self.http, &args.query, args.clamped_max(), Some("w")).await {
            Ok(hits) => render_results(&hits, &args.query),
            Err(e) => format!("DuckDuckGo news search failed: {}", e),
        }
    }
}
