//! Declared parameter schemas
//!
//! A [`ParamSchema`] is the single source of truth for a tool's arguments: it
//! renders the JSON Schema advertised to the model and validates incoming
//! calls. Parameters are required unless marked [`Param::optional`].

use crate::error::{Result, ToolError};
use serde_json::{Map, Value, json};

/// JSON type accepted for a parameter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamType {
    String,
    Integer,
    Number,
    Boolean,
    /// Array of strings
    StringArray,
    /// A single string or an array of strings
    StringOrArray,
}

impl ParamType {
    fn describe(self) -> &'static str {
        match self {
            Self::String => "a string",
            Self::Integer => "an integer",
            Self::Number => "a number",
            Self::Boolean => "a boolean",
            Self::StringArray => "an array of strings",
            Self::StringOrArray => "a string or an array of strings",
        }
    }

    fn accepts(self, value: &Value) -> bool {
        match self {
            Self::String => value.is_string(),
            Self::Integer => value.is_i64() || value.is_u64(),
            Self::Number => value.is_number(),
            Self::Boolean => value.is_boolean(),
            Self::StringArray => is_string_array(value),
            Self::StringOrArray => value.is_string() || is_string_array(value),
        }
    }
}

fn is_string_array(value: &Value) -> bool {
    value
        .as_array()
        .is_some_and(|items| items.iter().all(Value::is_string))
}

/// One declared parameter
#[derive(Debug, Clone, PartialEq)]
pub struct Param {
    pub name: String,
    pub kind: ParamType,
    pub description: String,
    pub required: bool,
    pub allowed: Option<Vec<String>>,
}

impl Param {
    pub fn new(name: impl Into<String>, kind: ParamType, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind,
            description: description.into(),
            required: true,
            allowed: None,
        }
    }

    pub fn string(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self::new(name, ParamType::String, description)
    }

    pub fn integer(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self::new(name, ParamType::Integer, description)
    }

    pub fn string_array(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self::new(name, ParamType::StringArray, description)
    }

    pub fn string_or_array(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self::new(name, ParamType::StringOrArray, description)
    }

    /// Mark the parameter optional
    pub fn optional(mut self) -> Self {
        self.required = false;
        self
    }

    /// Restrict a string parameter to a fixed set of values
    pub fn one_of(mut self, values: &[&str]) -> Self {
        self.allowed = Some(values.iter().map(ToString::to_string).collect());
        self
    }

    fn to_json(&self) -> Value {
        let mut property = match self.kind {
            ParamType::StringOrArray => json!({
                "anyOf": [
                    {"type": "string"},
                    {"type": "array", "items": {"type": "string"}}
                ],
            }),
            ParamType::StringArray => json!({"type": "array", "items": {"type": "string"}}),
            ParamType::String => json!({"type": "string"}),
            ParamType::Integer => json!({"type": "integer"}),
            ParamType::Number => json!({"type": "number"}),
            ParamType::Boolean => json!({"type": "boolean"}),
        };
        property["description"] = Value::String(self.description.clone());
        if let Some(allowed) = &self.allowed {
            property["enum"] = json!(allowed);
        }
        property
    }

    fn check(&self, value: &Value) -> Result<()> {
        if !self.kind.accepts(value) {
            return Err(ToolError::InvalidType {
                param: self.name.clone(),
                expected: self.kind.describe().to_string(),
            });
        }

        if let (Some(allowed), Some(text)) = (&self.allowed, value.as_str()) {
            if !allowed.iter().any(|a| a == text) {
                return Err(ToolError::InvalidValue {
                    param: self.name.clone(),
                    allowed: allowed.join(", "),
                });
            }
        }

        Ok(())
    }
}

/// Ordered list of parameters for one tool
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParamSchema {
    params: Vec<Param>,
}

impl ParamSchema {
    /// Schema for a tool that takes no arguments
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn new(params: Vec<Param>) -> Self {
        Self { params }
    }

    pub fn params(&self) -> &[Param] {
        &self.params
    }

    fn get(&self, name: &str) -> Option<&Param> {
        self.params.iter().find(|p| p.name == name)
    }

    /// JSON Schema object advertised to the model
    pub fn to_json_schema(&self) -> Value {
        let properties: Map<String, Value> = self
            .params
            .iter()
            .map(|p| (p.name.clone(), p.to_json()))
            .collect();
        let required: Vec<&str> = self
            .params
            .iter()
            .filter(|p| p.required)
            .map(|p| p.name.as_str())
            .collect();

        json!({
            "type": "object",
            "properties": properties,
            "required": required,
        })
    }

    /// Validate a call's arguments.
    ///
    /// `null` arguments are treated as an empty object and an explicit `null`
    /// for an optional parameter as if it were absent. Returns the accepted
    /// arguments with those nulls removed.
    pub fn validate(&self, tool: &str, args: &Value) -> Result<Map<String, Value>> {
        let object = match args {
            Value::Null => Map::new(),
            Value::Object(map) => map.clone(),
            _ => {
                return Err(ToolError::NotAnObject {
                    tool: tool.to_string(),
                });
            },
        };

        let mut accepted = Map::new();
        for (key, value) in object {
            let Some(param) = self.get(&key) else {
                return Err(ToolError::UnknownParameter {
                    tool: tool.to_string(),
                    param: key,
                });
            };
            if value.is_null() {
                continue;
            }
            param.check(&value)?;
            accepted.insert(key, value);
        }

        if let Some(missing) = self
            .params
            .iter()
            .find(|p| p.required && !accepted.contains_key(&p.name))
        {
            return Err(ToolError::MissingParameter {
                tool: tool.to_string(),
                param: missing.name.clone(),
            });
        }

        Ok(accepted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valuation_schema() -> ParamSchema {
        ParamSchema::new(vec![
            Param::string_or_array("tickers", "Bank ticker (string) or list of tickers (array)"),
            Param::string("metric", "Valuation metric")
                .one_of(&["PE", "PB", "PS"])
                .optional(),
        ])
    }

    #[test]
    fn test_json_schema_shape() {
        let schema = valuation_schema().to_json_schema();
        assert_eq!(schema["type"], "object");
        assert_eq!(schema["required"], json!(["tickers"]));
        assert_eq!(schema["properties"]["tickers"]["anyOf"][1]["items"]["type"], "string");
        assert_eq!(schema["properties"]["metric"]["enum"], json!(["PE", "PB", "PS"]));
    }

    #[test]
    fn test_validate_accepts_string_or_array() {
        let schema = valuation_schema();
        assert!(schema.validate("t", &json!({"tickers": "VCB"})).is_ok());
        assert!(schema.validate("t", &json!({"tickers": ["VCB", "ACB"], "metric": "PE"})).is_ok());
    }

    #[test]
    fn test_validate_rejects_unknown() {
        let err = valuation_schema()
            .validate("t", &json!({"tickers": "VCB", "window": 3}))
            .unwrap_err();
        assert!(matches!(err, ToolError::UnknownParameter { param, .. } if param == "window"));
    }

    #[test]
    fn test_validate_requires() {
        let err = valuation_schema().validate("t", &json!({"metric": "PB"})).unwrap_err();
        assert!(matches!(err, ToolError::MissingParameter { param, .. } if param == "tickers"));
    }

    #[test]
    fn test_validate_type_and_enum() {
        let schema = valuation_schema();
        assert!(matches!(
            schema.validate("t", &json!({"tickers": 7})),
            Err(ToolError::InvalidType { .. })
        ));
        assert!(matches!(
            schema.validate("t", &json!({"tickers": ["VCB", 1]})),
            Err(ToolError::InvalidType { .. })
        ));
        assert!(matches!(
            schema.validate("t", &json!({"tickers": "VCB", "metric": "EV"})),
            Err(ToolError::InvalidValue { .. })
        ));
    }

    #[test]
    fn test_null_handling() {
        let schema = valuation_schema();
        let accepted = schema
            .validate("t", &json!({"tickers": "VCB", "metric": null}))
            .unwrap();
        assert!(!accepted.contains_key("metric"));
        assert!(ParamSchema::empty().validate("t", &Value::Null).is_ok());
        assert!(matches!(
            schema.validate("t", &json!(["VCB"])),
            Err(ToolError::NotAnObject { .. })
        ));
    }

    #[test]
    fn test_integer_rejects_fraction() {
        let schema = ParamSchema::new(vec![Param::integer("periods", "n").optional()]);
        assert!(schema.validate("t", &json!({"periods": 5})).is_ok());
        assert!(schema.validate("t", &json!({"periods": 2.5})).is_err());
    }
}
