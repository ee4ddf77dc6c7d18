//! Ollama chat client.
//!
//! Talks to `POST /api/chat` in non-streaming mode with the tool catalog in
//! Ollama's function envelope. Some models return tool-call arguments as a
//! JSON string instead of an object; parsing handles both so one sloppy model
//! does not break the agent loop.

use super::{ChatMessage, ChatRequest, LlmClient, LlmError, Role, ToolCall, ToolSpec};
use crate::config::RunConfig;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info};

/// Request timeout. Local models can take a long time to first token on cold
/// start, so this is generous.
const REQUEST_TIMEOUT_SECS: u64 = 120;

/// How long Ollama keeps the model loaded after a request.
const DEFAULT_KEEP_ALIVE: &str = "5m";

/// Ollama-backed [`LlmClient`].
pub struct OllamaClient {
    http: reqwest::Client,
    base_url: String,
    model: String,
    temperature: f64,
    keep_alive: String,
}

impl OllamaClient {
    pub fn new(model: impl Into<String>, base_url: impl Into<String>, temperature: f64) -> Self {
        Self {
            http: reqwest::Client::builder()
                .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
                .build()
                .unwrap_or_default(),
            base_url: base_url.into(),
            model: model.into(),
            temperature,
            keep_alive: DEFAULT_KEEP_ALIVE.to_string(),
        }
    }

    pub fn from_config(config: &RunConfig) -> Self {
        Self::new(&config.model, &config.base_url, config.temperature)
    }

    /// Override how long the model stays loaded after a request ("5m", "0", "1h").
    pub fn with_keep_alive(mut self, keep_alive: &str) -> Self {
        self.keep_alive = keep_alive.to_string();
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Check whether the Ollama endpoint answers at all.
    pub async fn is_available(&self) -> bool {
        let url = format!("{}/api/tags", self.base_url);
        self.http
            .get(&url)
            .send()
            .await
            .map(|r| r.status().is_success())
            .unwrap_or(false)
    }
}

#[async_trait]
impl LlmClient for OllamaClient {
    async fn chat(&self, request: ChatRequest) -> Result<ChatMessage, LlmError> {
        let url = format!("{}/api/chat", self.base_url);

        let api_request = ApiRequest {
            model: &self.model,
            messages: request.messages.iter().map(ApiMessage::from).collect(),
            stream: false,
            tools: if request.tools.is_empty() {
                None
            } else {
                Some(request.tools.iter().map(ApiTool::from).collect())
            },
            options: ApiOptions {
                temperature: self.temperature,
            },
            keep_alive: &self.keep_alive,
        };

        info!(
            "[>]  LLM call [{}] ({} messages, {} tools)",
            self.model,
            request.messages.len(),
            request.tools.len()
        );

        let response = self
            .http
            .post(&url)
            .json(&api_request)
            .send()
            .await
            .map_err(|e| LlmError::Transport(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(LlmError::Endpoint { status, body });
        }

        let api_response: ApiResponse = response
            .json()
            .await
            .map_err(|e| LlmError::Malformed(e.to_string()))?;

        let message = api_response.message.into_chat_message()?;
        debug!(
            "[<]  LLM response ({} chars, {} tool calls)",
            message.content.len(),
            message.tool_calls.len()
        );
        Ok(message)
    }
}

// ============================================================================
// Wire types
// ============================================================================

#[derive(Serialize)]
struct ApiRequest<'a> {
    model: &'a str,
    messages: Vec<ApiMessage>,
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<Vec<ApiTool<'a>>>,
    options: ApiOptions,
    keep_alive: &'a str,
}

#[derive(Serialize)]
struct ApiOptions {
    temperature: f64,
}

#[derive(Serialize)]
struct ApiTool<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    function: &'a ToolSpec,
}

impl<'a> From<&'a ToolSpec> for ApiTool<'a> {
    fn from(spec: &'a ToolSpec) -> Self {
        Self {
            kind: "function",
            function: spec,
        }
    }
}

#[derive(Deserialize)]
struct ApiResponse {
    message: ApiMessage,
}

#[derive(Serialize, Deserialize)]
struct ApiMessage {
    role: String,
    #[serde(default)]
    content: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    tool_calls: Vec<ApiToolCall>,
}

#[derive(Serialize, Deserialize)]
struct ApiToolCall {
    function: ApiFunctionCall,
}

#[derive(Serialize, Deserialize)]
struct ApiFunctionCall {
    name: String,
    #[serde(default)]
    arguments: serde_json::Value,
}

impl From<&ChatMessage> for ApiMessage {
    fn from(msg: &ChatMessage) -> Self {
        Self {
            role: match msg.role {
                Role::System => "system",
                Role::User => "user",
                Role::Assistant => "assistant",
                Role::Tool => "tool",
            }
            .to_string(),
            content: msg.content.clone(),
            tool_calls: msg
                .tool_calls
                .iter()
                .map(|tc| ApiToolCall {
                    function: ApiFunctionCall {
                        name: tc.name.clone(),
                        arguments: tc.arguments.clone(),
                    },
                })
                .collect(),
        }
    }
}

impl ApiMessage {
    fn into_chat_message(self) -> Result<ChatMessage, LlmError> {
        let role = match self.role.as_str() {
            "system" => Role::System,
            "user" => Role::User,
            "assistant" => Role::Assistant,
            "tool" => Role::Tool,
            other => {
                return Err(LlmError::Malformed(format!("unknown role: {}", other)));
            }
        };

        let tool_calls = self
            .tool_calls
            .into_iter()
            .map(|tc| ToolCall {
                name: tc.function.name,
                arguments: coerce_arguments(tc.function.arguments),
            })
            .collect();

        Ok(ChatMessage {
            role,
            content: self.content,
            tool_calls,
        })
    }
}

/// Accept arguments as an object, or as a JSON string wrapping an object.
fn coerce_arguments(value: serde_json::Value) -> serde_json::Value {
    match value {
        serde_json::Value::String(s) => {
            serde_json::from_str(&s).unwrap_or(serde_json::Value::String(s))
        }
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_request_serialization_shape() {
        let tool_spec = ToolSpec {
            name: "search_web".to_string(),
            description: "Search the internet".to_string(),
            parameters: json!({"type": "object"}),
        };
        let request = ApiRequest {
            model: "llama3.2",
            messages: vec![ApiMessage::from(&ChatMessage::user("hi"))],
            stream: false,
            tools: Some(vec![ApiTool::from(&tool_spec)]),
            options: ApiOptions { temperature: 0.2 },
            keep_alive: "5m",
        };

        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value["model"], "llama3.2");
        assert_eq!(value["stream"], false);
        assert_eq!(value["tools"][0]["type"], "function");
        assert_eq!(value["tools"][0]["function"]["name"], "search_web");
        assert_eq!(value["options"]["temperature"], 0.2);
        assert_eq!(value["messages"][0]["role"], "user");
    }

    #[test]
    fn test_response_with_tool_calls() {
        let raw = json!({
            "role": "assistant",
            "content": "",
            "tool_calls": [
                {"function": {"name": "search_web", "arguments": {"query": "oslo weather"}}}
            ]
        });
        let api: ApiMessage = serde_json::from_value(raw).unwrap();
        let msg = api.into_chat_message().unwrap();
        assert_eq!(msg.role, Role::Assistant);
        assert_eq!(msg.tool_calls.len(), 1);
        assert_eq!(msg.tool_calls[0].arguments["query"], "oslo weather");
    }

    #[test]
    fn test_response_with_string_arguments() {
        let raw = json!({
            "role": "assistant",
            "content": "",
            "tool_calls": [
                {"function": {"name": "search_web", "arguments": "{\"query\": \"oslo\"}"}}
            ]
        });
        let api: ApiMessage = serde_json::from_value(raw).unwrap();
        let msg = api.into_chat_message().unwrap();
        assert_eq!(msg.tool_calls[0].arguments["query"], "oslo");
    }

    #[test]
    fn test_response_unknown_role() {
        let raw = json!({"role": "narrator", "content": "hm"});
        let api: ApiMessage = serde_json::from_value(raw).unwrap();
        assert!(api.into_chat_message().is_err());
    }

    #[test]
    fn test_client_construction() {
        let client = OllamaClient::new("llama3.2", "http://127.0.0.1:11434", 0.2)
            .with_keep_alive("10m");
        assert_eq!(client.model(), "llama3.2");
        assert_eq!(client.keep_alive, "10m");
    }
}
