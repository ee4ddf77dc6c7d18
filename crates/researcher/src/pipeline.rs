//! Pipeline orchestrator.
//!
//! Sequences Clarify -> Research -> Fact-Check -> Format for one query,
//! threads state between the stages, and writes exactly one research-log
//! entry per completed run: the *original* query, the *final* report, and
//! the total wall time. Intermediate drafts are never logged. Logging is
//! best-effort - an append failure is acknowledged with a warning and the
//! report is still returned.

use crate::agent::ResearchAgent;
use crate::llm::{ChatMessage, LlmClient};
use crate::prompts::enriched_prompt;
use crate::research_log::ResearchLog;
use crate::stages;
use crate::tools::ToolRegistry;
use anyhow::Result;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Instant;
use tokio_stream::wrappers::ReceiverStream;
use tracing::{info, warn};

/// Everything one pipeline run produced, for callers that want the
/// intermediate artifacts and not just the report.
#[derive(Debug, Clone)]
pub struct PipelineResult {
    /// Clarify stage output (scope restatement + plan). May be empty.
    pub clarification: String,
    /// Research stage draft (cited, unreviewed).
    pub draft: String,
    /// Fact-check critique.
    pub feedback: String,
    /// Final report as returned to the caller (tools-used section included).
    pub report: String,
    /// Tool names, duplicates removed, first-seen order.
    pub tools_used: Vec<String>,
    /// Total wall time across all four stages.
    pub elapsed_seconds: f64,
}

/// Callback invoked with the clarification before research begins, so a
/// front end can show the plan while results are still coming.
pub type PlanObserver<'a> = &'a (dyn Fn(&str) + Send + Sync);

/// The full research pipeline over one model, one tool registry, and one
/// shared research log.
pub struct ResearchPipeline {
    llm: Arc<dyn LlmClient>,
    agent: ResearchAgent,
    log: Arc<ResearchLog>,
}

impl ResearchPipeline {
    pub fn new(llm: Arc<dyn LlmClient>, registry: Arc<ToolRegistry>, log: Arc<ResearchLog>) -> Self {
        Self {
            agent: ResearchAgent::new(llm.clone(), registry),
            llm,
            log,
        }
    }

    /// The shared research log handle (front ends use it in stream mode,
    /// where they do their own logging).
    pub fn log(&self) -> Arc<ResearchLog> {
        self.log.clone()
    }

    /// Run the full pipeline and return the final report.
    pub async fn research(&self, query: &str) -> Result<String> {
        Ok(self.run(query, None).await?.report)
    }

    /// Run the full pipeline with a plan observer.
    ///
    /// The observer is invoked exactly once, synchronously, after the clarify
    /// stage and before research begins. A panic in the observer propagates.
    pub async fn research_with_observer(
        &self,
        query: &str,
        observer: Option<PlanObserver<'_>>,
    ) -> Result<PipelineResult> {
        self.run(query, observer).await
    }

    /// Direct mode: research stage only, for latency-sensitive callers.
    /// Logs the research draft itself, bypassing fact-check and format.
    pub async fn quick(&self, query: &str) -> Result<String> {
        let started = Instant::now();
        let outcome = self.agent.research(query).await?;
        let elapsed = started.elapsed().as_secs_f64();

        if let Err(e) = self.log.append(query, &outcome.draft, elapsed, None) {
            warn!("Research log append failed (ignored): {:#}", e);
        }
        Ok(outcome.draft)
    }

    /// Direct mode, streaming: yields each conversation message as the
    /// research stage produces it. The caller owns logging in this mode.
    pub fn stream(&self, query: &str) -> ReceiverStream<ChatMessage> {
        self.agent.stream(query)
    }

    async fn run(&self, query: &str, observer: Option<PlanObserver<'_>>) -> Result<PipelineResult> {
        let started = Instant::now();
        info!("Pipeline run started: {}", query);

        // Stage 1: clarify, then let the caller see the plan.
        let clarification = stages::clarify(self.llm.as_ref(), query).await;
        if let Some(observer) = observer {
            observer(&clarification);
        }

        // Stage 2: research against the enriched prompt. A blank
        // clarification would corrupt the enriched prompt, so it bypasses
        // enrichment entirely.
        let research_prompt = if clarification.trim().is_empty() {
            query.to_string()
        } else {
            enriched_prompt(query, &clarification)
        };
        let outcome = self.agent.research(&research_prompt).await?;

        // Stages 3 and 4 always see the original query, not the enriched one.
        let feedback = stages::fact_check(self.llm.as_ref(), query, &outcome.draft).await;
        let report = stages::format_report(self.llm.as_ref(), query, &outcome.draft, &feedback).await;

        let tools_used = dedup_first_seen(&outcome.tools_used);
        let report = append_tools_section(report, &tools_used);

        let elapsed = started.elapsed().as_secs_f64();
        if let Err(e) = self.log.append(query, &report, elapsed, None) {
            warn!("Research log append failed (ignored): {:#}", e);
        }

        info!("Pipeline run finished in {:.2}s", elapsed);
        Ok(PipelineResult {
            clarification,
            draft: outcome.draft,
            feedback,
            report,
            tools_used,
            elapsed_seconds: elapsed,
        })
    }
}

/// Duplicates removed, first-seen order preserved.
fn dedup_first_seen(names: &[String]) -> Vec<String> {
    let mut seen = HashSet::new();
    names
        .iter()
        .filter(|name| seen.insert(name.as_str()))
        .cloned()
        .collect()
}

/// Merge the tools-used summary into the report, if any tool ran.
fn append_tools_section(report: String, tools_used: &[String]) -> String {
    if tools_used.is_empty() {
        report
    } else {
        format!("{}\n\n---\nTools used: {}", report, tools_used.join(", "))
    }
}
