//! Error types for tool validation and execution

use thiserror::Error;

/// Result type alias for tool handlers
pub type Result<T> = std::result::Result<T, ToolError>;

/// Errors raised while validating or running a tool call.
///
/// Every variant is reported back to the model through a failed
/// [`ToolResult`](crate::ToolResult) envelope; none of them abort the loop.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ToolError {
    /// No tool registered under this name
    #[error("Unknown tool: {0}")]
    UnknownTool(String),

    /// Two tools registered under the same name
    #[error("Duplicate tool registration: {0}")]
    DuplicateTool(String),

    /// Arguments were not a JSON object
    #[error("Arguments for {tool} must be a JSON object")]
    NotAnObject { tool: String },

    /// Argument not declared by the schema
    #[error("Unknown parameter '{param}' for tool {tool}")]
    UnknownParameter { tool: String, param: String },

    /// Required argument absent
    #[error("Missing required parameter '{param}' for tool {tool}")]
    MissingParameter { tool: String, param: String },

    /// Argument present with the wrong JSON type
    #[error("Parameter '{param}' must be {expected}")]
    InvalidType { param: String, expected: String },

    /// Argument outside its allowed values
    #[error("Parameter '{param}' must be one of: {allowed}")]
    InvalidValue { param: String, allowed: String },

    /// Handler-level failure, reported verbatim
    #[error("{0}")]
    Failed(String),
}

impl ToolError {
    /// Handler-level failure with a plain message
    pub fn failed(message: impl Into<String>) -> Self {
        Self::Failed(message.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ToolError::MissingParameter {
            tool: "compare_banks".to_string(),
            param: "tickers".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Missing required parameter 'tickers' for tool compare_banks"
        );
        assert_eq!(ToolError::failed("No data found").to_string(), "No data found");
    }
}
