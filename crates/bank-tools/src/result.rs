//! Uniform tool result envelope

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Outcome of one dispatched tool call.
///
/// Serializes as `{"status":"success","data":{...}}` or
/// `{"status":"failed","message":"..."}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum ToolResult {
    Success { data: Value },
    Failed { message: String },
}

impl ToolResult {
    pub fn success(data: Value) -> Self {
        Self::Success { data }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self::Failed {
            message: message.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    pub fn data(&self) -> Option<&Value> {
        match self {
            Self::Success { data } => Some(data),
            Self::Failed { .. } => None,
        }
    }

    pub fn message(&self) -> Option<&str> {
        match self {
            Self::Success { .. } => None,
            Self::Failed { message } => Some(message),
        }
    }

    /// Envelope as sent back to the model
    pub fn to_json_string(&self) -> String {
        match serde_json::to_string(self) {
            Ok(json) => json,
            Err(e) => format!("{{\"status\":\"failed\",\"message\":\"unserializable result: {e}\"}}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_success_envelope() {
        let result = ToolResult::success(json!({"records": 1}));
        assert_eq!(
            serde_json::to_value(&result).unwrap(),
            json!({"status": "success", "data": {"records": 1}})
        );
        assert!(result.is_success());
    }

    #[test]
    fn test_failed_envelope() {
        let result = ToolResult::failed("No data found");
        assert_eq!(
            result.to_json_string(),
            "{\"status\":\"failed\",\"message\":\"No data found\"}"
        );
        assert_eq!(result.message(), Some("No data found"));
    }
}
