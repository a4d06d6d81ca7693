//! Tool argument validation against a tool's parameter schema.

use jsonschema::Validator;
use serde_json::{Map, Value};

use crate::types::{McpError, McpResult, Tool};

/// Errors reported per rejected call.
const MAX_REPORTED_ERRORS: usize = 5;

/// A tool's `parameters` compiled once, checked on every call.
///
/// A tool with no schema (null or `{}`) accepts any arguments.
pub struct ArgumentSchema {
    validator: Option<Validator>,
}

impl ArgumentSchema {
    /// Compile the parameter schema of `tool`.
    pub fn compile(tool: &Tool) -> McpResult<Self> {
        let validator = match &tool.parameters {
            Value::Null => None,
            Value::Object(map) if map.is_empty() => None,
            schema => Some(jsonschema::validator_for(schema).map_err(|e| {
                McpError::InvalidParams(format!(
                    "tool {} has an invalid parameter schema: {e}",
                    tool.name
                ))
            })?),
        };
        Ok(Self { validator })
    }

    /// Check `arguments`. Absent arguments are checked as an empty object.
    pub fn validate(&self, arguments: &Value) -> McpResult<()> {
        let Some(validator) = &self.validator else {
            return Ok(());
        };

        let empty = Value::Object(Map::new());
        let arguments = if arguments.is_null() { &empty } else { arguments };
        if validator.is_valid(arguments) {
            return Ok(());
        }

        let message = validator
            .iter_errors(arguments)
            .take(MAX_REPORTED_ERRORS)
            .map(|e| e.to_string())
            .collect::<Vec<_>>()
            .join("; ");
        if message.is_empty() {
            return Err(McpError::InvalidParams("invalid arguments".into()));
        }
        Err(McpError::InvalidParams(message))
    }
}

impl std::fmt::Debug for ArgumentSchema {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ArgumentSchema")
            .field("constrained", &self.validator.is_some())
            .finish()
    }
}
