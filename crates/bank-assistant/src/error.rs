//! Error types for the assistant

use bank_data::DataError;
use bank_llm::LLMError;
use bank_tools::ToolError;
use thiserror::Error;

/// Errors surfaced by the assistant's operations
#[derive(Debug, Error)]
pub enum AssistantError {
    /// Invalid or incomplete configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// A data file was missing or malformed
    #[error(transparent)]
    Data(#[from] DataError),

    /// Tool registration failed
    #[error("Tool error: {0}")]
    Tool(#[from] ToolError),

    /// A model call failed outside answer generation
    #[error("LLM error: {0}")]
    Llm(#[from] LLMError),

    /// The final answer could not be generated
    #[error("Response generation failed: {0}")]
    Generation(#[source] LLMError),

    /// Price source failure
    #[error("Price API error: {0}")]
    PriceApi(String),

    /// Network or HTTP error
    #[error("Network error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON parsing error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Period or entity token could not be parsed
    #[error(transparent)]
    Parse(#[from] bank_core::Error),
}

impl AssistantError {
    /// Whether the error came from the answer-generation call
    pub fn is_generation(&self) -> bool {
        matches!(self, Self::Generation(_))
    }
}

/// Result type alias for assistant operations
pub type Result<T> = std::result::Result<T, AssistantError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generation_is_distinct() {
        let err = AssistantError::Generation(LLMError::Timeout("30s".to_string()));
        assert!(err.is_generation());
        assert!(err.to_string().starts_with("Response generation failed"));

        let err: AssistantError = LLMError::Timeout("30s".to_string()).into();
        assert!(!err.is_generation());
    }

    #[test]
    fn test_data_error_keeps_path() {
        let err: AssistantError = DataError::MissingFile {
            path: "Data/dfsectoryear.csv".into(),
        }
        .into();
        assert!(err.to_string().contains("dfsectoryear.csv"));
    }
}
