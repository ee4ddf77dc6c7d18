//! Runtime configuration.
//!
//! Everything is overridable through environment variables so the CLI and
//! chat front ends can share one setup path without a config file.

use std::env;
use std::path::PathBuf;

/// Default Ollama model. Must support tool calling (llama3.2, mistral, ...).
pub const DEFAULT_MODEL: &str = "llama3.2";

/// Default Ollama API endpoint.
pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:11434";

/// Default research log location (working directory).
pub const DEFAULT_LOG_PATH: &str = "research_log.json";

/// Default sampling temperature (low for reproducible research output).
pub const DEFAULT_TEMPERATURE: f64 = 0.2;

/// Resolved runtime configuration for one front end.
#[derive(Debug, Clone)]
pub struct RunConfig {
    /// Ollama model name (`OLLAMA_MODEL`).
    pub model: String,
    /// Ollama API base URL (`OLLAMA_BASE_URL`).
    pub base_url: String,
    /// Path to the research log file (`RESEARCH_LOG_PATH`).
    pub log_path: PathBuf,
    /// Sampling temperature, 0-1.
    pub temperature: f64,
}

impl RunConfig {
    /// Build a config from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        Self {
            model: env::var("OLLAMA_MODEL").unwrap_or_else(|_| DEFAULT_MODEL.to_string()),
            base_url: env::var("OLLAMA_BASE_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.to_string()),
            log_path: env::var("RESEARCH_LOG_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from(DEFAULT_LOG_PATH)),
            temperature: DEFAULT_TEMPERATURE,
        }
    }
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
            log_path: PathBuf::from(DEFAULT_LOG_PATH),
            temperature: DEFAULT_TEMPERATURE,
        }
    }
}
