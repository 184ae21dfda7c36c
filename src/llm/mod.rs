//! LLM integration for the change proposer.
//!
//! A single OpenAI-compatible Chat Completions provider is supported; tests
//! substitute their own [`LlmProvider`].

mod openai;
mod provider;

pub use openai::OpenAiCompatProvider;
pub use provider::{
    ChatMessage, CompletionRequest, CompletionResponse, FinishReason, LlmProvider,
    ResponseSchema, Role,
};

use std::sync::Arc;

use crate::config::LlmConfig;
use crate::error::LlmError;

/// Create an LLM provider based on configuration.
pub fn create_llm_provider(config: &LlmConfig) -> Result<Arc<dyn LlmProvider>, LlmError> {
    tracing::info!(
        "Using chat completions API at {} with model {}",
        config.base_url,
        config.model
    );
    Ok(Arc::new(OpenAiCompatProvider::new(config.clone())?))
}

/// Extract the outermost JSON object from text that might contain other
/// content, such as a Markdown code fence or a leading sentence.
pub fn extract_json(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    if start < end {
        Some(&text[start..=end])
    } else {
        None
    }
}
