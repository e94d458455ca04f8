//! LLM provider trait definition

use crate::{CompletionRequest, CompletionResponse, Result};
use async_trait::async_trait;

/// A chat-completion backend.
///
/// Everything that talks to the model goes through this trait so the
/// tool-chaining loop and the response generator can be driven by scripted
/// providers in tests.
#[async_trait]
pub trait LLMProvider: Send + Sync {
    /// Generate one completion for the given conversation
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse>;

    /// Provider name used in logs
    fn name(&self) -> &str;
}
