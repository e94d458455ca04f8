//! Final answer generation for the router path

use crate::config::AssistantConfig;
use crate::error::{AssistantError, Result};
use crate::prompts;
use crate::router::QueryMode;
use bank_llm::{CompletionRequest, LLMError, LLMProvider};
use std::sync::Arc;
use tracing::{info, warn};

/// One model call turning retrieved context into an answer
pub struct ResponseGenerator {
    provider: Arc<dyn LLMProvider>,
    model: String,
    temperature: f32,
    max_tokens: usize,
}

impl ResponseGenerator {
    pub fn new(provider: Arc<dyn LLMProvider>, model: impl Into<String>, temperature: f32) -> Self {
        Self {
            provider,
            model: model.into(),
            temperature,
            max_tokens: 1000,
        }
    }

    pub fn from_config(provider: Arc<dyn LLMProvider>, config: &AssistantConfig) -> Self {
        Self::new(provider, &config.commentary_model, config.answer_temperature)
    }

    /// Concise answer over a rendered data table
    pub async fn quantitative(&self, question: &str, table: &str, valuation: &str) -> Result<String> {
        self.generate(
            QueryMode::Quantitative,
            prompts::QUANTITATIVE_SYSTEM,
            prompts::quantitative_prompt(question, table, valuation),
        )
        .await
    }

    /// Analyst answer over collected commentary
    pub async fn qualitative(&self, question: &str, commentary: &str, valuation: &str) -> Result<String> {
        self.generate(
            QueryMode::Qualitative,
            prompts::QUALITATIVE_SYSTEM,
            prompts::qualitative_prompt(question, commentary, valuation),
        )
        .await
    }

    /// Answer in the style of `mode`
    pub async fn respond(&self, mode: QueryMode, question: &str, context: &str, valuation: &str) -> Result<String> {
        match mode {
            QueryMode::Quantitative => self.quantitative(question, context, valuation).await,
            QueryMode::Qualitative => self.qualitative(question, context, valuation).await,
        }
    }

    async fn generate(&self, mode: QueryMode, system: &str, prompt: String) -> Result<String> {
        let request = CompletionRequest::builder(&self.model)
            .system(system)
            .user(prompt)
            .temperature(self.temperature)
            .max_tokens(self.max_tokens)
            .build();

        let response = self.provider.complete(request).await.map_err(|e| {
            warn!(mode = ?mode, error = %e, "Answer generation failed");
            AssistantError::Generation(e)
        })?;
        info!(
            mode = ?mode,
            input_tokens = response.usage.input_tokens,
            output_tokens = response.usage.output_tokens,
            "Answer generated"
        );

        match response.message.text() {
            Some(text) if !text.trim().is_empty() => Ok(text.to_string()),
            _ => Err(AssistantError::Generation(LLMError::UnexpectedResponse(
                "model returned an empty answer".to_string(),
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::ScriptedProvider;

    fn generator(provider: Arc<ScriptedProvider>) -> ResponseGenerator {
        ResponseGenerator::from_config(provider, &AssistantConfig::default())
    }

    #[tokio::test]
    async fn test_quantitative_prompt_and_verbatim_answer() {
        let provider = Arc::new(ScriptedProvider::new(vec![ScriptedProvider::text(
            "  ACB ROE was 18% in 1Q24.",
        )]));
        let answer = generator(provider.clone())
            .quantitative("ACB ROE?", "| ACB | 0.18 |", "")
            .await
            .unwrap();
        assert_eq!(answer, "  ACB ROE was 18% in 1Q24.");

        let requests = provider.requests();
        assert_eq!(requests.len(), 1);
        let request = &requests[0];
        assert_eq!(request.model, "gpt-4o-mini");
        assert_eq!(request.temperature, Some(0.3));
        assert_eq!(request.system.as_deref(), Some(prompts::QUANTITATIVE_SYSTEM));
        assert!(request.messages[0].text().unwrap().contains("Data Table:\n| ACB | 0.18 |"));
        assert!(!request.offers_tools());
    }

    #[tokio::test]
    async fn test_qualitative_style() {
        let provider = Arc::new(ScriptedProvider::new(vec![ScriptedProvider::text("Outlook is stable.")]));
        let answer = generator(provider.clone())
            .respond(QueryMode::Qualitative, "Outlook?", "=== ACB ===", "")
            .await
            .unwrap();
        assert_eq!(answer, "Outlook is stable.");
        assert_eq!(provider.requests()[0].system.as_deref(), Some(prompts::QUALITATIVE_SYSTEM));
    }

    #[tokio::test]
    async fn test_failure_is_a_generation_error() {
        let provider = Arc::new(ScriptedProvider::failing(LLMError::Timeout("60s".to_string())));
        let err = generator(provider.clone())
            .quantitative("ACB ROE?", "| ACB |", "")
            .await
            .unwrap_err();
        assert!(err.is_generation());
        // No retry
        assert_eq!(provider.requests().len(), 1);
    }

    #[tokio::test]
    async fn test_empty_answer_is_an_error() {
        let provider = Arc::new(ScriptedProvider::new(vec![ScriptedProvider::text("   ")]));
        let err = generator(provider).qualitative("Why?", "", "").await.unwrap_err();
        assert!(matches!(err, AssistantError::Generation(LLMError::UnexpectedResponse(_))));
    }
}
