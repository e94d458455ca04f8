//! Immutable tool registry
//!
//! Built once at startup through [`ToolRegistryBuilder`] and never modified
//! afterwards, so it can be shared behind an `Arc` without locking.

use crate::{Arguments, ParamSchema, Tool, ToolError, ToolResult};
use bank_llm::ToolDefinition;
use futures::future::join_all;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

struct Entry {
    schema: ParamSchema,
    handler: Arc<dyn Tool>,
}

/// Mapping from tool name to (parameter schema, handler)
pub struct ToolRegistry {
    entries: HashMap<String, Entry>,
    order: Vec<String>,
}

impl ToolRegistry {
    /// Start building a registry
    pub fn builder() -> ToolRegistryBuilder {
        ToolRegistryBuilder::default()
    }

    /// Get a tool by name
    pub fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.entries.get(name).map(|e| Arc::clone(&e.handler))
    }

    /// Declared schema of a tool
    pub fn schema(&self, name: &str) -> Option<&ParamSchema> {
        self.entries.get(name).map(|e| &e.schema)
    }

    /// Tool names in registration order
    pub fn names(&self) -> &[String] {
        &self.order
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Definitions advertised to the model, in registration order
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.order
            .iter()
            .filter_map(|name| {
                self.entries.get(name).map(|entry| {
                    ToolDefinition::new(
                        name.clone(),
                        entry.handler.description(),
                        entry.schema.to_json_schema(),
                    )
                })
            })
            .collect()
    }

    /// Validate `args` and run the named tool.
    ///
    /// Unknown tools and invalid arguments produce a failed envelope without
    /// touching the handler. Handler errors are converted the same way.
    pub async fn dispatch(&self, name: &str, args: Value) -> ToolResult {
        let Some(entry) = self.entries.get(name) else {
            warn!(tool_name = %name, "Model requested unknown tool");
            return ToolResult::failed(ToolError::UnknownTool(name.to_string()).to_string());
        };

        let accepted = match entry.schema.validate(name, &args) {
            Ok(accepted) => accepted,
            Err(e) => {
                warn!(tool_name = %name, error = %e, "Rejected tool arguments");
                return ToolResult::failed(e.to_string());
            },
        };

        let start = Instant::now();
        let outcome = entry.handler.execute(Arguments::new(accepted)).await;
        let duration_ms = start.elapsed().as_millis();

        match outcome {
            Ok(data) => {
                info!(tool_name = %name, duration_ms, "Tool completed");
                ToolResult::success(data)
            },
            Err(e) => {
                debug!(tool_name = %name, duration_ms, error = %e, "Tool reported failure");
                ToolResult::failed(e.to_string())
            },
        }
    }

    /// Dispatch several independent calls concurrently.
    ///
    /// Results are returned in the order of `calls`.
    pub async fn dispatch_all(&self, calls: Vec<(String, Value)>) -> Vec<ToolResult> {
        join_all(
            calls
                .into_iter()
                .map(|(name, args)| async move { self.dispatch(&name, args).await }),
        )
        .await
    }
}

/// Builder for [`ToolRegistry`]
#[derive(Default)]
pub struct ToolRegistryBuilder {
    tools: Vec<Arc<dyn Tool>>,
}

impl ToolRegistryBuilder {
    /// Add a tool
    pub fn register<T: Tool + 'static>(mut self, tool: T) -> Self {
        self.tools.push(Arc::new(tool));
        self
    }

    /// Freeze the registry; duplicate names are rejected
    pub fn build(self) -> crate::Result<ToolRegistry> {
        let mut entries = HashMap::with_capacity(self.tools.len());
        let mut order = Vec::with_capacity(self.tools.len());

        for handler in self.tools {
            let name = handler.name().to_string();
            if entries.contains_key(&name) {
                return Err(ToolError::DuplicateTool(name));
            }
            let schema = handler.parameters();
            order.push(name.clone());
            entries.insert(name, Entry { schema, handler });
        }

        debug!(tools = order.len(), "Tool registry built");
        Ok(ToolRegistry { entries, order })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Param, Result};
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct EchoTool {
        calls: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl Tool for EchoTool {
        async fn execute(&self, args: Arguments) -> Result<Value> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let tickers = args.require_list("tickers")?;
            if tickers.iter().any(|t| t == "NONE") {
                return Err(ToolError::failed("No data found"));
            }
            Ok(json!({"tickers": tickers, "period": args.str("period")}))
        }

        fn name(&self) -> &str {
            "echo"
        }

        fn description(&self) -> &str {
            "Echo arguments"
        }

        fn parameters(&self) -> ParamSchema {
            ParamSchema::new(vec![
                Param::string_or_array("tickers", "Tickers"),
                Param::string("period", "Period").optional(),
            ])
        }
    }

    fn registry() -> (ToolRegistry, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        let registry = ToolRegistry::builder()
            .register(EchoTool {
                calls: Arc::clone(&calls),
            })
            .build()
            .unwrap();
        (registry, calls)
    }

    #[tokio::test]
    async fn test_valid_call_succeeds() {
        let (registry, calls) = registry();
        let result = registry
            .dispatch("echo", json!({"tickers": "ACB", "period": "1Q24"}))
            .await;
        assert!(result.is_success());
        assert_eq!(result.data().unwrap()["tickers"], json!(["ACB"]));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_missing_required_skips_handler() {
        let (registry, calls) = registry();
        let result = registry.dispatch("echo", json!({"period": "1Q24"})).await;
        assert!(!result.is_success());
        assert!(result.message().unwrap().contains("tickers"));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_unknown_parameter_skips_handler() {
        let (registry, calls) = registry();
        let result = registry
            .dispatch("echo", json!({"tickers": "ACB", "extra": true}))
            .await;
        assert!(!result.is_success());
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_type_mismatch_skips_handler() {
        let (registry, calls) = registry();
        let result = registry.dispatch("echo", json!({"tickers": 42})).await;
        assert!(!result.is_success());
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_unknown_tool() {
        let (registry, _) = registry();
        let result = registry.dispatch("drop_tables", json!({})).await;
        assert_eq!(result.message(), Some("Unknown tool: drop_tables"));
    }

    #[tokio::test]
    async fn test_handler_failure_becomes_envelope() {
        let (registry, calls) = registry();
        let result = registry.dispatch("echo", json!({"tickers": ["NONE"]})).await;
        assert_eq!(result, ToolResult::failed("No data found"));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_dispatch_all_keeps_order() {
        let (registry, calls) = registry();
        let results = registry
            .dispatch_all(vec![
                ("echo".to_string(), json!({"tickers": "A1"})),
                ("missing".to_string(), json!({})),
                ("echo".to_string(), json!({"tickers": "B2"})),
            ])
            .await;
        assert_eq!(results.len(), 3);
        assert_eq!(results[0].data().unwrap()["tickers"], json!(["A1"]));
        assert!(!results[1].is_success());
        assert_eq!(results[2].data().unwrap()["tickers"], json!(["B2"]));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_duplicate_registration_rejected() {
        let calls = Arc::new(AtomicUsize::new(0));
        let result = ToolRegistry::builder()
            .register(EchoTool {
                calls: Arc::clone(&calls),
            })
            .register(EchoTool { calls })
            .build();
        assert!(matches!(result, Err(ToolError::DuplicateTool(name)) if name == "echo"));
    }

    #[test]
    fn test_definitions() {
        let (registry, _) = registry();
        let definitions = registry.definitions();
        assert_eq!(definitions.len(), 1);
        assert_eq!(definitions[0].name, "echo");
        assert_eq!(definitions[0].input_schema["required"], json!(["tickers"]));
        assert_eq!(registry.names(), ["echo".to_string()]);
    }
}
