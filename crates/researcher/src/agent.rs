//! Research stage - the agent loop.
//!
//! One conversational turn as a small state machine: the model either
//! produces final content (done) or requests tool calls, which are dispatched
//! in the order the model asked for them and appended as tool-result messages
//! before control returns to the model. Every invocation is recorded, in call
//! order and including duplicates, for the tools-used summary.

use crate::llm::{ChatMessage, ChatRequest, LlmClient, Role};
use crate::prompts::RESEARCHER_SYSTEM_PROMPT;
use crate::tools::ToolRegistry;
use anyhow::{Context, Result};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tracing::{debug, info, warn};

/// Draft substituted when the model never produces final content.
pub const FALLBACK_ANSWER: &str = "I couldn't generate a response. Please try again.";

/// Upper bound on model turns per run, so a model stuck requesting tools
/// cannot spin forever.
pub const MAX_TOOL_ROUNDS: usize = 8;

/// What one research run produced.
#[derive(Debug, Clone)]
pub struct ResearchOutcome {
    /// The cited but unreviewed answer.
    pub draft: String,
    /// Tool names in call order, duplicates included.
    pub tools_used: Vec<String>,
    /// Full conversation, for display or debugging.
    pub conversation: Vec<ChatMessage>,
}

/// The research agent: one model, one tool registry, one system prompt.
#[derive(Clone)]
pub struct ResearchAgent {
    llm: Arc<dyn LlmClient>,
    registry: Arc<ToolRegistry>,
}

impl ResearchAgent {
    pub fn new(llm: Arc<dyn LlmClient>, registry: Arc<ToolRegistry>) -> Self {
        Self { llm, registry }
    }

    /// Run one research turn to completion and return the draft.
    pub async fn research(&self, query: &str) -> Result<ResearchOutcome> {
        self.run(query, None).await
    }

    /// Run one research turn, yielding each newly produced message as it
    /// appears (tool-call announcements included). Pull-based: dropping the
    /// stream stops the run; there is no explicit cancel signal.
    pub fn stream(&self, query: &str) -> ReceiverStream<ChatMessage> {
        let (tx, rx) = mpsc::channel(16);
        let agent = self.clone();
        let query = query.to_string();
        tokio::spawn(async move {
            if let Err(e) = agent.run(&query, Some(&tx)).await {
                // Surface the failure in-band so the consumer sees something.
                let _ = tx
                    .send(ChatMessage::assistant(format!("Research failed: {e:#}")))
                    .await;
            }
        });
        ReceiverStream::new(rx)
    }

    async fn run(
        &self,
        query: &str,
        updates: Option<&mpsc::Sender<ChatMessage>>,
    ) -> Result<ResearchOutcome> {
        let mut messages = vec![
            ChatMessage::system(RESEARCHER_SYSTEM_PROMPT),
            ChatMessage::user(query),
        ];
        let mut tools_used = Vec::new();

        info!("Research turn started ({} tools available)", self.registry.len());

        'turns: for round in 0..MAX_TOOL_ROUNDS {
            let request = ChatRequest::with_tools(messages.clone(), self.registry.specs());
            let reply = self
                .llm
                .chat(request)
                .await
                .context("Model call failed during research")?;

            messages.push(reply.clone());
            if !emit(updates, reply.clone()).await {
                break 'turns;
            }

            if reply.tool_calls.is_empty() {
                debug!("Model produced final content on round {}", round + 1);
                break;
            }

            for call in &reply.tool_calls {
                tools_used.push(call.name.clone());
                let result = self.registry.dispatch(call).await;
                debug!("Tool '{}' returned {} chars", call.name, result.len());

                let tool_message = ChatMessage::tool(result);
                messages.push(tool_message.clone());
                if !emit(updates, tool_message).await {
                    break 'turns;
                }
            }
        }

        let draft = messages
            .iter()
            .rev()
            .find(|m| m.role == Role::Assistant && m.has_content())
            .map(|m| m.content.clone())
            .unwrap_or_else(|| {
                warn!("Model produced no final content, using fallback answer");
                FALLBACK_ANSWER.to_string()
            });

        Ok(ResearchOutcome {
            draft,
            tools_used,
            conversation: messages,
        })
    }
}

/// Send an update to a streaming consumer. Returns false when the consumer
/// dropped the stream and the run should stop.
async fn emit(updates: Option<&mpsc::Sender<ChatMessage>>, message: ChatMessage) -> bool {
    match updates {
        Some(tx) => tx.send(message).await.is_ok(),
        None => true,
    }
}
