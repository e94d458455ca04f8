//! Chat session state
//!
//! A session keeps the question/answer history that is replayed to the model
//! on every new question, plus a log of every tool call made on its behalf.
//! Intermediate tool traffic is not kept in the history.

use crate::error::Result;
use crate::orchestrator::{ChainOutcome, ToolChainExecutor, ToolExecution};
use bank_llm::Message;
use chrono::{DateTime, Local};
use serde::Serialize;
use std::path::Path;
use tracing::info;
use uuid::Uuid;

/// Conversation with the tool-chaining assistant
#[derive(Debug, Clone)]
pub struct Session {
    id: Uuid,
    created_at: DateTime<Local>,
    messages: Vec<Message>,
    tool_executions: Vec<ToolExecution>,
}

#[derive(Serialize)]
struct SessionExport<'a> {
    session_id: Uuid,
    created_at: DateTime<Local>,
    conversation: &'a [Message],
    tool_executions: &'a [ToolExecution],
    timestamp: DateTime<Local>,
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl Session {
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            created_at: Local::now(),
            messages: Vec::new(),
            tool_executions: Vec::new(),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn created_at(&self) -> DateTime<Local> {
        self.created_at
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn tool_executions(&self) -> &[ToolExecution] {
        &self.tool_executions
    }

    /// Ask a question through `executor`, recording the exchange.
    ///
    /// A failed model call leaves the session untouched.
    pub async fn ask(&mut self, executor: &ToolChainExecutor, question: &str) -> Result<ChainOutcome> {
        let outcome = executor.run(&self.messages, question).await?;
        self.record(question, &outcome);
        Ok(outcome)
    }

    /// Append a finished exchange
    pub fn record(&mut self, question: &str, outcome: &ChainOutcome) {
        self.messages.push(Message::user(question));
        self.messages.push(Message::assistant(outcome.answer.clone()));
        self.tool_executions.extend(outcome.executions.iter().cloned());
        info!(
            session_id = %self.id,
            turns = self.messages.len() / 2,
            tool_calls = self.tool_executions.len(),
            "Session updated"
        );
    }

    /// Forget the history and the tool log
    pub fn reset(&mut self) {
        self.messages.clear();
        self.tool_executions.clear();
        info!(session_id = %self.id, "Session cleared");
    }

    /// `{conversation, tool_executions, timestamp}` as pretty JSON
    pub fn export_json(&self) -> Result<String> {
        let export = SessionExport {
            session_id: self.id,
            created_at: self.created_at,
            conversation: &self.messages,
            tool_executions: &self.tool_executions,
            timestamp: Local::now(),
        };
        Ok(serde_json::to_string_pretty(&export)?)
    }

    pub fn export_to(&self, path: impl AsRef<Path>) -> Result<()> {
        std::fs::write(path.as_ref(), self.export_json()?)?;
        info!(session_id = %self.id, path = %path.as_ref().display(), "Session exported");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AssistantConfig;
    use crate::orchestrator::{ChainStatus, ToolChainConfig};
    use crate::testing::{ScriptedProvider, fixtures};
    use crate::tools::build_registry;
    use crate::prices::MockPriceSource;
    use bank_llm::LLMError;
    use serde_json::{Value, json};
    use std::sync::Arc;
    use tempfile::TempDir;

    fn executor(provider: ScriptedProvider) -> ToolChainExecutor {
        let registry = build_registry(fixtures::bank_data(), Arc::new(MockPriceSource::new()), 5).unwrap();
        ToolChainExecutor::new(
            Arc::new(provider),
            Arc::new(registry),
            ToolChainConfig::from_config(&AssistantConfig::default()),
        )
    }

    #[tokio::test]
    async fn test_ask_records_history_and_tool_log() {
        let executor = executor(ScriptedProvider::new(vec![
            ScriptedProvider::tool_calls(vec![("c1", "get_bank_info", json!({"tickers": ["VCB"]}))]),
            ScriptedProvider::text("VCB is a SOCB bank."),
        ]));
        let mut session = Session::new();

        let outcome = session.ask(&executor, "Which sector is VCB in?").await.unwrap();
        assert_eq!(outcome.status, ChainStatus::Completed);
        assert_eq!(session.messages().len(), 2);
        assert_eq!(session.messages()[1].text(), Some(outcome.answer.as_str()));
        assert_eq!(session.tool_executions().len(), 1);
        assert_eq!(session.tool_executions()[0].tool, "get_bank_info");
        assert_eq!(
            session.tool_executions()[0].result.data().unwrap()["sector"],
            "SOCB"
        );
    }

    #[tokio::test]
    async fn test_failed_question_leaves_session_untouched() {
        let executor = executor(ScriptedProvider::failing(LLMError::Timeout("60s".to_string())));
        let mut session = Session::new();
        assert!(session.ask(&executor, "Hi").await.is_err());
        assert!(session.messages().is_empty());
    }

    #[tokio::test]
    async fn test_export_and_reset() {
        let executor = executor(ScriptedProvider::new(vec![
            ScriptedProvider::tool_calls(vec![("c1", "list_all_banks", json!({}))]),
            ScriptedProvider::text("Four banks."),
        ]));
        let mut session = Session::new();
        session.ask(&executor, "How many banks?").await.unwrap();

        let dir = TempDir::new().unwrap();
        let path = dir.path().join("chat.json");
        session.export_to(&path).unwrap();
        let exported: Value = serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(exported["conversation"][0]["role"], "user");
        assert_eq!(exported["conversation"][0]["content"], "How many banks?");
        assert_eq!(exported["tool_executions"][0]["tool"], "list_all_banks");
        assert_eq!(exported["tool_executions"][0]["result"]["status"], "success");
        assert!(exported["timestamp"].is_string());

        let id = session.id();
        session.reset();
        assert!(session.messages().is_empty());
        assert!(session.tool_executions().is_empty());
        assert_eq!(session.id(), id);
    }
}
