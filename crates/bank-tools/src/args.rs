//! Validated tool arguments

use crate::error::{Result, ToolError};
use serde_json::{Map, Value};

/// Arguments of one call, already checked against the tool's schema.
///
/// Accessors therefore only distinguish present from absent; a wrongly typed
/// value cannot reach a handler through [`ToolRegistry::dispatch`](crate::ToolRegistry::dispatch).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Arguments {
    values: Map<String, Value>,
}

impl Arguments {
    pub fn new(values: Map<String, Value>) -> Self {
        Self { values }
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }

    pub fn str(&self, name: &str) -> Option<&str> {
        self.values.get(name).and_then(Value::as_str)
    }

    pub fn integer(&self, name: &str) -> Option<i64> {
        self.values.get(name).and_then(Value::as_i64)
    }

    /// A string-or-array parameter flattened to a list; empty strings dropped
    pub fn string_list(&self, name: &str) -> Option<Vec<String>> {
        let list: Vec<String> = match self.values.get(name)? {
            Value::String(s) => vec![s.clone()],
            Value::Array(items) => items
                .iter()
                .filter_map(Value::as_str)
                .map(ToString::to_string)
                .collect(),
            _ => return None,
        };
        let list: Vec<String> = list
            .into_iter()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();
        (!list.is_empty()).then_some(list)
    }

    /// Required string; a handler-level failure when absent
    pub fn require_str(&self, name: &str) -> Result<&str> {
        self.str(name)
            .ok_or_else(|| ToolError::failed(format!("Missing parameter: {name}")))
    }

    /// Required list; a handler-level failure when absent or empty
    pub fn require_list(&self, name: &str) -> Result<Vec<String>> {
        self.string_list(name)
            .ok_or_else(|| ToolError::failed(format!("Missing parameter: {name}")))
    }
}

impl From<Map<String, Value>> for Arguments {
    fn from(values: Map<String, Value>) -> Self {
        Self::new(values)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn args(value: Value) -> Arguments {
        match value {
            Value::Object(map) => Arguments::new(map),
            _ => panic!("object expected"),
        }
    }

    #[test]
    fn test_string_list_from_string_and_array() {
        let a = args(json!({"one": "VCB", "many": ["ACB", " ", "BID"]}));
        assert_eq!(a.string_list("one").unwrap(), vec!["VCB"]);
        assert_eq!(a.string_list("many").unwrap(), vec!["ACB", "BID"]);
        assert_eq!(a.string_list("absent"), None);
    }

    #[test]
    fn test_empty_list_is_absent() {
        let a = args(json!({"tickers": []}));
        assert_eq!(a.string_list("tickers"), None);
        assert!(a.require_list("tickers").is_err());
    }

    #[test]
    fn test_scalar_accessors() {
        let a = args(json!({"metric": "PE", "periods": 3}));
        assert_eq!(a.str("metric"), Some("PE"));
        assert_eq!(a.integer("periods"), Some(3));
        assert!(a.require_str("quarter").is_err());
    }
}
