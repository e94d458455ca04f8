//! One chat completion over a banking conversation
//!
//! Every model call in the assistant is a [`CompletionRequest`]: the tool loop
//! sends the running history with the tool schemas, the query parser asks for
//! a JSON object, and the answer and commentary writers send a single user
//! prompt under their own system prompt.

use crate::{Message, ToolDefinition};

const DEFAULT_MAX_TOKENS: usize = 1024;

/// Shape of the answer the model must produce
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ResponseFormat {
    #[default]
    Text,
    /// A single JSON object, used by the query parser
    JsonObject,
}

#[derive(Debug, Clone)]
pub struct CompletionRequest {
    pub model: String,
    /// Sent ahead of `messages`
    pub system: Option<String>,
    pub messages: Vec<Message>,
    pub max_tokens: usize,
    /// Provider default when unset
    pub temperature: Option<f32>,
    /// Empty when the model may not call tools
    pub tools: Vec<ToolDefinition>,
    pub response_format: ResponseFormat,
}

impl CompletionRequest {
    pub fn builder(model: impl Into<String>) -> CompletionRequestBuilder {
        CompletionRequestBuilder {
            request: Self {
                model: model.into(),
                system: None,
                messages: Vec::new(),
                max_tokens: DEFAULT_MAX_TOKENS,
                temperature: None,
                tools: Vec::new(),
                response_format: ResponseFormat::Text,
            },
        }
    }

    /// True when tool schemas go out with the request
    pub fn offers_tools(&self) -> bool {
        !self.tools.is_empty()
    }
}

/// What came back from one completion
#[derive(Debug, Clone)]
pub struct CompletionResponse {
    pub message: Message,
    pub stop_reason: StopReason,
    pub usage: TokenUsage,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// Final answer
    EndTurn,
    /// Cut off by `max_tokens`
    MaxTokens,
    /// The model asked for one or more tool calls
    ToolUse,
}

/// Prompt and completion token counts as reported by the provider
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TokenUsage {
    pub input_tokens: usize,
    pub output_tokens: usize,
}

/// Fluent construction of a [`CompletionRequest`]
#[derive(Debug)]
pub struct CompletionRequestBuilder {
    request: CompletionRequest,
}

impl CompletionRequestBuilder {
    /// Replace the conversation, used when replaying tool-loop history
    pub fn messages(mut self, messages: Vec<Message>) -> Self {
        self.request.messages = messages;
        self
    }

    /// Append a user turn
    pub fn user(mut self, text: impl Into<String>) -> Self {
        self.request.messages.push(Message::user(text));
        self
    }

    pub fn system(mut self, system: impl Into<String>) -> Self {
        self.request.system = Some(system.into());
        self
    }

    pub fn max_tokens(mut self, max_tokens: usize) -> Self {
        self.request.max_tokens = max_tokens;
        self
    }

    pub fn temperature(mut self, temperature: f32) -> Self {
        self.request.temperature = Some(temperature);
        self
    }

    pub fn tools(mut self, tools: Vec<ToolDefinition>) -> Self {
        self.request.tools = tools;
        self
    }

    pub fn json_output(mut self) -> Self {
        self.request.response_format = ResponseFormat::JsonObject;
        self
    }

    pub fn build(self) -> CompletionRequest {
        self.request
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parser_request_shape() {
        let request = CompletionRequest::builder("gpt-4o-mini")
            .system("Extract tickers and quarters as JSON.")
            .user("ROE of VCB and BID in 2Q25")
            .temperature(0.0)
            .max_tokens(500)
            .json_output()
            .build();

        assert_eq!(request.model, "gpt-4o-mini");
        assert_eq!(request.messages.len(), 1);
        assert_eq!(request.messages[0].text(), Some("ROE of VCB and BID in 2Q25"));
        assert_eq!(request.temperature, Some(0.0));
        assert_eq!(request.max_tokens, 500);
        assert_eq!(request.response_format, ResponseFormat::JsonObject);
        assert!(!request.offers_tools());
    }

    #[test]
    fn test_tool_loop_request_keeps_history() {
        let history = vec![
            Message::user("Compare CASA of ACB and MBB"),
            Message::assistant("Checking data availability first."),
        ];
        let tool = ToolDefinition::new(
            "get_data_availability",
            "List the quarters loaded for each ticker",
            json!({"type": "object", "properties": {}}),
        );
        let request = CompletionRequest::builder("gpt-4o")
            .messages(history)
            .tools(vec![tool])
            .build();

        assert_eq!(request.messages.len(), 2);
        assert!(request.offers_tools());
        assert_eq!(request.max_tokens, DEFAULT_MAX_TOKENS);
        assert_eq!(request.temperature, None);
        assert_eq!(request.response_format, ResponseFormat::Text);
    }
}
