//! Model boundary.
//!
//! All four stages talk to the language model through the [`LlmClient`]
//! trait: one request carrying system instructions, conversation history and
//! (for the research stage) a tool catalog; one response that is either final
//! text or a set of requested tool invocations. Production uses
//! [`OllamaClient`]; tests use [`FakeLlmClient`] with scripted turns.

mod fake;
mod ollama;

pub use fake::{FakeLlmClient, FakeLlmClientBuilder, FakeTurn};
pub use ollama::OllamaClient;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Message roles in a conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
    Tool,
}

/// A tool invocation requested by the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    pub name: String,
    /// JSON object of model-supplied arguments.
    #[serde(default)]
    pub arguments: serde_json::Value,
}

impl ToolCall {
    pub fn new(name: impl Into<String>, arguments: serde_json::Value) -> Self {
        Self {
            name: name.into(),
            arguments,
        }
    }
}

/// One conversation message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<ToolCall>,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
            tool_calls: Vec::new(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
            tool_calls: Vec::new(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
            tool_calls: Vec::new(),
        }
    }

    pub fn assistant_tool_calls(tool_calls: Vec<ToolCall>) -> Self {
        Self {
            role: Role::Assistant,
            content: String::new(),
            tool_calls,
        }
    }

    pub fn tool(content: impl Into<String>) -> Self {
        Self {
            role: Role::Tool,
            content: content.into(),
            tool_calls: Vec::new(),
        }
    }

    /// True when the message carries non-whitespace text.
    pub fn has_content(&self) -> bool {
        !self.content.trim().is_empty()
    }
}

/// Model-facing description of one tool: name, natural-language description,
/// and a JSON-schema parameter object the model uses to build arguments.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolSpec {
    pub name: String,
    pub description: String,
    pub parameters: serde_json::Value,
}

/// One complete model request.
#[derive(Debug, Clone)]
pub struct ChatRequest {
    pub messages: Vec<ChatMessage>,
    /// Tool catalog offered to the model; empty for the tool-free stages.
    pub tools: Vec<ToolSpec>,
}

impl ChatRequest {
    pub fn new(messages: Vec<ChatMessage>) -> Self {
        Self {
            messages,
            tools: Vec::new(),
        }
    }

    pub fn with_tools(messages: Vec<ChatMessage>, tools: Vec<ToolSpec>) -> Self {
        Self { messages, tools }
    }

    /// The system instruction of this request, if any.
    pub fn system_prompt(&self) -> Option<&str> {
        self.messages
            .iter()
            .find(|m| m.role == Role::System)
            .map(|m| m.content.as_str())
    }
}

/// Model boundary errors.
#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("Model request failed: {0}")]
    Transport(String),

    #[error("Model endpoint returned {status}: {body}")]
    Endpoint { status: u16, body: String },

    #[error("Malformed model response: {0}")]
    Malformed(String),
}

/// A complete-response language model client.
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Send one request, get one assistant message back (final text or
    /// requested tool calls).
    async fn chat(&self, request: ChatRequest) -> Result<ChatMessage, LlmError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_constructors() {
        let msg = ChatMessage::system("be helpful");
        assert_eq!(msg.role, Role::System);
        assert!(msg.tool_calls.is_empty());

        let msg = ChatMessage::assistant_tool_calls(vec![ToolCall::new(
            "search_web",
            serde_json::json!({"query": "test"}),
        )]);
        assert_eq!(msg.role, Role::Assistant);
        assert!(!msg.has_content());
        assert_eq!(msg.tool_calls[0].name, "search_web");
    }

    #[test]
    fn test_has_content_ignores_whitespace() {
        assert!(!ChatMessage::assistant("   \n ").has_content());
        assert!(ChatMessage::assistant("Paris.").has_content());
    }

    #[test]
    fn test_role_serialization() {
        assert_eq!(serde_json::to_string(&Role::Assistant).unwrap(), "\"assistant\"");
        assert_eq!(serde_json::to_string(&Role::Tool).unwrap(), "\"tool\"");
    }

    #[test]
    fn test_request_system_prompt() {
        let request = ChatRequest::new(vec![
            ChatMessage::system("instructions"),
            ChatMessage::user("question"),
        ]);
        assert_eq!(request.system_prompt(), Some("instructions"));
        assert!(ChatRequest::new(vec![]).system_prompt().is_none());
    }
}
