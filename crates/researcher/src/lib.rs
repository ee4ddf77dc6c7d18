//! Researcher - agentic web research with cited answers.
//!
//! The library turns a natural-language question into a cited report by
//! sequencing four model-driven stages (clarify, research with tools,
//! fact-check, format) over a shared tool registry and a relevance-scored
//! research log. Front ends stay thin: they construct a
//! [`pipeline::ResearchPipeline`] and call `research`, `quick` or `stream`.

pub mod agent;
pub mod config;
pub mod llm;
pub mod pipeline;
pub mod prompts;
pub mod research_log;
pub mod stages;
pub mod tools;

pub use agent::{ResearchAgent, ResearchOutcome, FALLBACK_ANSWER};
pub use config::RunConfig;
pub use llm::{
    ChatMessage, ChatRequest, FakeLlmClient, FakeLlmClientBuilder, FakeTurn, LlmClient, LlmError,
    OllamaClient, Role, ToolCall, ToolSpec,
};
pub use pipeline::{PipelineResult, ResearchPipeline};
pub use research_log::{FileBackend, LogBackend, LogEntry, MemoryBackend, ResearchLog};
pub use tools::{
    FailingTool, LogLookupTool, SearchNewsTool, SearchWebTool, StaticTool, Tool, ToolRegistry,
};
