//! Tool contract and registry.
//!
//! Every external data source the model can call satisfies one contract: a
//! stable name (used in citations and the tools-used summary), a description
//! the model chooses by, a JSON-schema argument object, and a call that
//! always comes back with a string. A tool never errors past its boundary -
//! network, parse and timeout failures are converted to descriptive text
//! (`"<Source> search failed: <reason>"`), and a missing credential becomes
//! an explanatory string naming the expected environment variable, so the
//! agent loop always has something to reason over.

mod log_lookup;
mod web_search;

pub use log_lookup::LogLookupTool;
pub use web_search::{SearchNewsTool, SearchWebTool};

use crate::llm::{ToolCall, ToolSpec};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tracing::{debug, warn};

/// A named, described, boundary-safe data lookup the model can invoke.
#[async_trait]
pub trait Tool: Send + Sync {
    /// Stable identifier (used in the tools-used summary and citations).
    fn name(&self) -> &str;

    /// Natural-language description the model selects by.
    fn description(&self) -> &str;

    /// JSON-schema object describing the arguments.
    fn parameters(&self) -> serde_json::Value;

    /// Invoke the tool. Must not fail: errors come back as descriptive text.
    async fn call(&self, arguments: serde_json::Value) -> String;
}

/// Static name -> tool map, built at startup.
#[derive(Default)]
pub struct ToolRegistry {
    tools: HashMap<String, Arc<dyn Tool>>,
    /// Registration order, so the model-facing catalog is stable.
    order: Vec<String>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tool. A duplicate name replaces the earlier registration.
    pub fn register(&mut self, tool: Arc<dyn Tool>) {
        let name = tool.name().to_string();
        if self.tools.insert(name.clone(), tool).is_some() {
            warn!("Tool '{}' registered twice, replacing earlier one", name);
        } else {
            self.order.push(name);
        }
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools.get(name).cloned()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    pub fn names(&self) -> Vec<String> {
        self.order.clone()
    }

    /// Model-facing catalog in registration order.
    pub fn specs(&self) -> Vec<ToolSpec> {
        self.order
            .iter()
            .filter_map(|name| self.tools.get(name))
            .map(|tool| ToolSpec {
                name: tool.name().to_string(),
                description: tool.description().to_string(),
                parameters: tool.parameters(),
            })
            .collect()
    }

    /// Dispatch one model-requested call. Unknown names take an explicit
    /// error path but still yield a string the model can recover from.
    pub async fn dispatch(&self, call: &ToolCall) -> String {
        match self.get(&call.name) {
            Some(tool) => {
                debug!("Dispatching tool '{}' with {}", call.name, call.arguments);
                tool.call(call.arguments.clone()).await
            }
            None => {
                warn!("Model requested unknown tool '{}'", call.name);
                format!(
                    "Unknown tool: {}. Available tools: {}",
                    call.name,
                    self.names().join(", ")
                )
            }
        }
    }
}

// ============================================================================
// Test doubles
// ============================================================================

/// Tool returning a canned string; counts invocations.
pub struct StaticTool {
    name: String,
    description: String,
    output: String,
    calls: AtomicUsize,
}

impl StaticTool {
    pub fn new(name: &str, description: &str, output: &str) -> Self {
        Self {
            name: name.to_string(),
            description: description.to_string(),
            output: output.to_string(),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Tool for StaticTool {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn parameters(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "query": {"type": "string", "description": "The search query"}
            },
            "required": ["query"]
        })
    }

    async fn call(&self, _arguments: serde_json::Value) -> String {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.output.clone()
    }
}

/// Tool whose internals always fail; demonstrates the boundary contract by
/// converting the failure into a string instead of propagating it.
pub struct FailingTool {
    name: String,
    reason: String,
}

impl FailingTool {
    pub fn new(name: &str, reason: &str) -> Self {
        Self {
            name: name.to_string(),
            reason: reason.to_string(),
        }
    }
}

#[async_trait]
impl Tool for FailingTool {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        "A data source that is currently failing"
    }

    fn parameters(&self) -> serde_json::Value {
        serde_json::json!({"type": "object", "properties": {}})
    }

    async fn call(&self, _arguments: serde_json::Value) -> String {
        let failure: anyhow::Result<String> = Err(anyhow::anyhow!(self.reason.clone()));
        match failure {
            Ok(output) => output,
            Err(e) => format!("{} search failed: {}", self.name, e),
        }
    }
}
