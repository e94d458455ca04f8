//! Tool-chaining loop
//!
//! Drives the model through repeated turns: every turn either requests tool
//! calls, which are dispatched through the [`ToolRegistry`] and fed back as
//! tool results, or produces the final answer. The loop is bounded by a
//! ceiling on the number of dispatched tool calls; reaching it ends the loop
//! with the partial transcript and a notice in place of an answer.

use crate::config::AssistantConfig;
use crate::error::Result;
use crate::prompts::TOOL_LOOP_SYSTEM;
use bank_llm::{CompletionRequest, LLMProvider, Message, StopReason, ToolCall};
use bank_tools::{ToolRegistry, ToolResult};
use chrono::{DateTime, Local};
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Answer used when the model ends its turn without any text
pub const EMPTY_ANSWER: &str =
    "Your question is too generic, please ask a more specific question about the banking data.";

/// Where the loop stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ChainStatus {
    /// The model produced a final answer
    Completed,
    /// The dispatch ceiling was reached first
    CeilingReached,
}

/// One dispatched tool call
#[derive(Debug, Clone, Serialize)]
pub struct ToolExecution {
    pub tool: String,
    pub arguments: Value,
    pub timestamp: DateTime<Local>,
    pub result: ToolResult,
}

/// Result of one question through the loop
#[derive(Debug, Clone)]
pub struct ChainOutcome {
    pub answer: String,
    pub status: ChainStatus,
    pub executions: Vec<ToolExecution>,
    /// Every message exchanged, starting with the prior history
    pub transcript: Vec<Message>,
}

impl ChainOutcome {
    pub fn tool_calls(&self) -> usize {
        self.executions.len()
    }
}

/// Settings of the loop
#[derive(Debug, Clone)]
pub struct ToolChainConfig {
    pub model: String,
    pub system_prompt: String,
    pub max_tool_calls: usize,
    pub max_tokens: usize,
    pub temperature: f32,
}

impl ToolChainConfig {
    pub fn from_config(config: &AssistantConfig) -> Self {
        Self {
            model: config.model.clone(),
            system_prompt: TOOL_LOOP_SYSTEM.to_string(),
            max_tool_calls: config.max_tool_calls,
            max_tokens: config.max_tokens,
            temperature: config.chat_temperature,
        }
    }
}

/// Footer appended to answers that needed tools
pub fn tool_summary(answer: &str, tool_calls: usize) -> String {
    match tool_calls {
        0 => answer.to_string(),
        1 => format!("{answer}\n\n---\n*Analysis completed using 1 tool.*"),
        n => format!("{answer}\n\n---\n*Analysis completed using {n} tools.*"),
    }
}

/// Notice returned instead of an answer when the ceiling is reached
pub fn ceiling_notice(tool_calls: usize) -> String {
    format!(
        "I've executed {tool_calls} tools but may need more to fully answer your question. \
         The analysis so far is incomplete. Please ask me to continue if you need more details."
    )
}

/// Runs the model/tool loop
pub struct ToolChainExecutor {
    provider: Arc<dyn LLMProvider>,
    registry: Arc<ToolRegistry>,
    config: ToolChainConfig,
}

impl ToolChainExecutor {
    pub fn new(provider: Arc<dyn LLMProvider>, registry: Arc<ToolRegistry>, config: ToolChainConfig) -> Self {
        Self {
            provider,
            registry,
            config,
        }
    }

    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    /// Answer `question` given the prior conversation.
    ///
    /// Model failures are returned as errors; tool failures never are, they
    /// reach the model as failed envelopes.
    pub async fn run(&self, history: &[Message], question: &str) -> Result<ChainOutcome> {
        let mut conversation = history.to_vec();
        conversation.push(Message::user(question));
        let tools = self.registry.definitions();
        let mut executions: Vec<ToolExecution> = Vec::new();
        let mut turn = 0_usize;

        loop {
            turn += 1;
            info!(
                turn,
                dispatched = executions.len(),
                max_tool_calls = self.config.max_tool_calls,
                "Tool loop turn started"
            );

            let request = CompletionRequest::builder(&self.config.model)
                .messages(conversation.clone())
                .system(self.config.system_prompt.clone())
                .max_tokens(self.config.max_tokens)
                .temperature(self.config.temperature)
                .tools(tools.clone())
                .build();

            let response = self.provider.complete(request).await?;
            info!(
                stop_reason = ?response.stop_reason,
                input_tokens = response.usage.input_tokens,
                output_tokens = response.usage.output_tokens,
                "LLM response received"
            );

            let calls = response.message.tool_calls();
            conversation.push(response.message.clone());

            if calls.is_empty() {
                if response.stop_reason == StopReason::MaxTokens {
                    warn!(turn, "Final answer truncated by the token limit");
                }
                let text = response
                    .message
                    .text()
                    .map(str::trim)
                    .filter(|t| !t.is_empty())
                    .unwrap_or(EMPTY_ANSWER);
                info!(turn, tool_calls = executions.len(), "Tool loop completed");
                return Ok(ChainOutcome {
                    answer: tool_summary(text, executions.len()),
                    status: ChainStatus::Completed,
                    executions,
                    transcript: conversation,
                });
            }

            let remaining = self.config.max_tool_calls.saturating_sub(executions.len());
            let (allowed, skipped) = calls.split_at(calls.len().min(remaining));
            let results = self.dispatch(allowed, &mut executions).await;

            let mut messages: Vec<(String, String, bool)> = allowed
                .iter()
                .zip(&results)
                .map(|(call, result)| (call.id.clone(), result.to_json_string(), !result.is_success()))
                .collect();
            for call in skipped {
                let notice = ToolResult::failed(format!(
                    "Tool call limit of {} reached",
                    self.config.max_tool_calls
                ));
                messages.push((call.id.clone(), notice.to_json_string(), true));
            }
            conversation.push(Message::tool_results(messages));

            if executions.len() >= self.config.max_tool_calls {
                warn!(
                    turn,
                    dispatched = executions.len(),
                    skipped = skipped.len(),
                    "Tool call ceiling reached, returning partial results"
                );
                return Ok(ChainOutcome {
                    answer: ceiling_notice(executions.len()),
                    status: ChainStatus::CeilingReached,
                    executions,
                    transcript: conversation,
                });
            }
        }
    }

    /// Dispatch one turn's calls concurrently; results keep call order
    async fn dispatch(&self, calls: &[ToolCall], executions: &mut Vec<ToolExecution>) -> Vec<ToolResult> {
        for call in calls {
            let preview: String = call.input.to_string().chars().take(500).collect();
            info!(tool_name = %call.name, tool_id = %call.id, input_preview = %preview, "Executing tool");
        }

        let timestamp = Local::now();
        let results = self
            .registry
            .dispatch_all(
                calls
                    .iter()
                    .map(|call| (call.name.clone(), call.input.clone()))
                    .collect(),
            )
            .await;

        for (call, result) in calls.iter().zip(&results) {
            if let Some(message) = result.message() {
                debug!(tool_name = %call.name, message, "Tool returned failure");
            }
            executions.push(ToolExecution {
                tool: call.name.clone(),
                arguments: call.input.clone(),
                timestamp,
                result: result.clone(),
            });
        }
        results
    }
}
