//! Deterministic fake model for tests.
//!
//! Scripted turns play back in order and every request is recorded, so tests
//! can assert both what the pipeline asked and in which order, without a
//! network or a live model.

use super::{ChatMessage, ChatRequest, LlmClient, LlmError, ToolCall};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Mutex;

/// One scripted model turn.
#[derive(Debug, Clone)]
pub enum FakeTurn {
    /// Final text.
    Content(String),
    /// Requested tool invocations.
    ToolCalls(Vec<ToolCall>),
    /// Transport-level failure.
    Fail(String),
}

/// What the fake does once its script runs dry.
#[derive(Debug, Clone)]
enum Exhausted {
    Content(String),
    Fail(String),
}

/// Scripted [`LlmClient`] that records every request.
pub struct FakeLlmClient {
    turns: Mutex<VecDeque<FakeTurn>>,
    requests: Mutex<Vec<ChatRequest>>,
    exhausted: Exhausted,
}

impl FakeLlmClient {
    /// A fake that answers every request with the same text.
    pub fn with_content(content: &str) -> Self {
        FakeLlmClientBuilder::new().build_with_exhausted(content)
    }

    /// A fake whose every call fails at the transport level.
    pub fn always_failing(reason: &str) -> Self {
        Self {
            turns: Mutex::new(VecDeque::new()),
            requests: Mutex::new(Vec::new()),
            exhausted: Exhausted::Fail(reason.to_string()),
        }
    }

    /// Requests seen so far, in call order.
    pub fn requests(&self) -> Vec<ChatRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

#[async_trait]
impl LlmClient for FakeLlmClient {
    async fn chat(&self, request: ChatRequest) -> Result<ChatMessage, LlmError> {
        self.requests.lock().unwrap().push(request);

        let turn = self.turns.lock().unwrap().pop_front();
        match turn {
            Some(FakeTurn::Content(content)) => Ok(ChatMessage::assistant(content)),
            Some(FakeTurn::ToolCalls(calls)) => Ok(ChatMessage::assistant_tool_calls(calls)),
            Some(FakeTurn::Fail(reason)) => Err(LlmError::Transport(reason)),
            None => match &self.exhausted {
                Exhausted::Content(content) => Ok(ChatMessage::assistant(content.clone())),
                Exhausted::Fail(reason) => Err(LlmError::Transport(reason.clone())),
            },
        }
    }
}

/// Builder for scripted fakes.
///
/// ```rust
/// use researcher::FakeLlmClientBuilder;
/// use serde_json::json;
///
/// let fake = FakeLlmClientBuilder::new()
///     .content("Scope confirmed.\n1. Search the web.")
///     .tool_call("search_web", json!({"query": "capital of France"}))
///     .content("Paris is the capital of France. [1](https://example.com/paris)")
///     .build();
/// ```
#[derive(Default)]
pub struct FakeLlmClientBuilder {
    turns: VecDeque<FakeTurn>,
}

impl FakeLlmClientBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a final-text turn.
    pub fn content(mut self, content: &str) -> Self {
        self.turns.push_back(FakeTurn::Content(content.to_string()));
        self
    }

    /// Add a turn requesting one tool call.
    pub fn tool_call(mut self, name: &str, arguments: serde_json::Value) -> Self {
        self.turns
            .push_back(FakeTurn::ToolCalls(vec![ToolCall::new(name, arguments)]));
        self
    }

    /// Add a turn requesting several tool calls at once.
    pub fn tool_calls(mut self, calls: Vec<ToolCall>) -> Self {
        self.turns.push_back(FakeTurn::ToolCalls(calls));
        self
    }

    /// Add a failing turn.
    pub fn fail(mut self, reason: &str) -> Self {
        self.turns.push_back(FakeTurn::Fail(reason.to_string()));
        self
    }

    /// Add an arbitrary turn.
    pub fn turn(mut self, turn: FakeTurn) -> Self {
        self.turns.push_back(turn);
        self
    }

    pub fn build(self) -> FakeLlmClient {
        self.build_with_exhausted("ok")
    }

    /// Build with explicit content for requests past the end of the script.
    pub fn build_with_exhausted(self, content: &str) -> FakeLlmClient {
        FakeLlmClient {
            turns: Mutex::new(self.turns),
            requests: Mutex::new(Vec::new()),
            exhausted: Exhausted::Content(content.to_string()),
        }
    }
}
