//! Language model access for bank-rs
//!
//! Provider-agnostic chat types used by the tool-chaining loop, the query
//! parser and the response generator:
//!
//! - Message and content-block types, including tool calls and tool results
//! - Completion request/response types
//! - Tool definitions advertised to the model
//! - The [`LLMProvider`] trait and an OpenAI-compatible implementation

pub mod completion;
pub mod error;
pub mod messages;
pub mod provider;
pub mod tools;

pub use completion::{CompletionRequest, CompletionResponse, ResponseFormat, StopReason, TokenUsage};
pub use error::{LLMError, Result};
pub use messages::{ContentBlock, Message, MessageContent, Role, ToolCall};
pub use provider::LLMProvider;
pub use tools::ToolDefinition;

#[cfg(feature = "openai")]
pub mod providers;
