//! The tool-free pipeline stages: clarify, fact-check, format.
//!
//! Each is a pure transformation through one model call, and each degrades to
//! a neutral fallback instead of failing the run: a weak model response never
//! crashes the pipeline, and a transport failure here is survivable because
//! the research stage has already produced (or will produce) the draft.

use crate::llm::{ChatMessage, ChatRequest, LlmClient};
use crate::prompts;
use tracing::warn;

/// Fallback critique when the fact-check stage yields nothing.
pub const NO_FEEDBACK: &str = "No feedback";

/// Restate the question and propose a research plan.
///
/// Failure or an empty reply degrades to an empty clarification, which the
/// orchestrator treats as "use the raw query".
pub async fn clarify(llm: &dyn LlmClient, query: &str) -> String {
    let request = ChatRequest::new(vec![
        ChatMessage::system(prompts::CLARIFY_SYSTEM_PROMPT),
        ChatMessage::user(prompts::clarify_prompt(query)),
    ]);

    match llm.chat(request).await {
        Ok(msg) => msg.content.trim().to_string(),
        Err(e) => {
            warn!("Clarify stage failed, continuing with raw query: {}", e);
            String::new()
        }
    }
}

/// Critique a draft for uncorroborated claims, bias, and weak sources.
pub async fn fact_check(llm: &dyn LlmClient, query: &str, draft: &str) -> String {
    let request = ChatRequest::new(vec![
        ChatMessage::system(prompts::FACT_CHECK_SYSTEM_PROMPT),
        ChatMessage::user(prompts::fact_check_prompt(query, draft)),
    ]);

    match llm.chat(request).await {
        Ok(msg) if msg.has_content() => msg.content.trim().to_string(),
        Ok(_) => NO_FEEDBACK.to_string(),
        Err(e) => {
            warn!("Fact-check stage failed: {}", e);
            NO_FEEDBACK.to_string()
        }
    }
}

/// Reconcile draft and critique into the final report.
///
/// Failure or an empty reply falls back to the unmodified draft - losing the
/// polish, never the content.
pub async fn format_report(llm: &dyn LlmClient, query: &str, draft: &str, feedback: &str) -> String {
    let request = ChatRequest::new(vec![
        ChatMessage::system(prompts::FORMAT_SYSTEM_PROMPT),
        ChatMessage::user(prompts::format_prompt(query, draft, feedback)),
    ]);

    match llm.chat(request).await {
        Ok(msg) if msg.has_content() => msg.content.trim().to_string(),
        Ok(_) => draft.to_string(),
        Err(e) => {
            warn!("Format stage failed, returning unmodified draft: {}", e);
            draft.to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::{FakeLlmClient, FakeLlmClientBuilder};

    #[tokio::test]
    async fn test_clarify_returns_trimmed_content() {
        let fake = FakeLlmClient::with_content("  Scope.\n1. Step one.  ");
        let clarification = clarify(&fake, "question").await;
        assert_eq!(clarification, "Scope.\n1. Step one.");
    }

    #[tokio::test]
    async fn test_clarify_degrades_to_empty_on_failure() {
        let fake = FakeLlmClient::always_failing("down");
        assert_eq!(clarify(&fake, "question").await, "");
    }

    #[tokio::test]
    async fn test_fact_check_empty_reply_is_no_feedback() {
        let fake = FakeLlmClient::with_content("   ");
        assert_eq!(fact_check(&fake, "q", "draft").await, NO_FEEDBACK);
    }

    #[tokio::test]
    async fn test_fact_check_failure_is_no_feedback() {
        let fake = FakeLlmClient::always_failing("down");
        assert_eq!(fact_check(&fake, "q", "draft").await, NO_FEEDBACK);
    }

    #[tokio::test]
    async fn test_format_failure_returns_draft() {
        let fake = FakeLlmClient::always_failing("down");
        let draft = "The draft. [1](https://example.com)";
        assert_eq!(format_report(&fake, "q", draft, "feedback").await, draft);
    }

    #[tokio::test]
    async fn test_format_empty_reply_returns_draft() {
        let fake = FakeLlmClient::with_content("");
        let draft = "The draft.";
        assert_eq!(format_report(&fake, "q", draft, "none").await, draft);
    }

    #[tokio::test]
    async fn test_stages_send_no_tools() {
        let fake = FakeLlmClientBuilder::new().content("ok").content("ok").content("ok").build();
        clarify(&fake, "q").await;
        fact_check(&fake, "q", "d").await;
        format_report(&fake, "q", "d", "f").await;
        for request in fake.requests() {
            assert!(request.tools.is_empty());
        }
    }
}
