//! Registry entry records: tools, resources, and prompts.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A callable tool exposed by the host.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tool {
    /// Tool name (unique).
    pub name: String,
    /// Human-readable description.
    #[serde(default)]
    pub description: String,
    /// JSON Schema for the arguments.
    #[serde(default)]
    pub parameters: Value,
    /// JSON Schema for the result.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub returns: Option<Value>,
}

/// A readable, metadata-writable resource exposed by the host.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Resource {
    /// Resource URI (unique).
    pub uri: String,
    /// Resource sub-type, e.g. `file` or `memory`.
    #[serde(rename = "type", default)]
    pub kind: String,
    /// Human-readable name.
    #[serde(default)]
    pub name: String,
    /// Description.
    #[serde(default)]
    pub description: String,
    /// Free-form metadata; the only field `resources/write` replaces.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Value>,
}

/// A renderable prompt template exposed by the host.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prompt {
    /// Prompt name (unique).
    pub name: String,
    /// Description.
    #[serde(default)]
    pub description: String,
    /// Template text with `{{key}}` placeholders.
    #[serde(default)]
    pub template: String,
    /// Declared variables, informational only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variables: Option<Map<String, Value>>,
}

impl Tool {
    pub fn new(name: impl Into<String>, description: impl Into<String>, parameters: Value) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            parameters,
            returns: None,
        }
    }
}

impl Resource {
    pub fn new(
        uri: impl Into<String>,
        kind: impl Into<String>,
        name: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            uri: uri.into(),
            kind: kind.into(),
            name: name.into(),
            description: description.into(),
            metadata: None,
        }
    }
}

impl Prompt {
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        template: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            template: template.into(),
            variables: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn resource_kind_serializes_as_type() {
        let resource = Resource::new("file:///notes.md", "file", "notes", "Project notes");
        let value = serde_json::to_value(&resource).unwrap();
        assert_eq!(value["type"], "file");
        assert!(value.get("metadata").is_none());
    }

    #[test]
    fn tool_returns_is_optional() {
        let tool: Tool = serde_json::from_value(json!({
            "name": "calculator",
            "description": "Performs basic arithmetic",
            "parameters": {"type": "object"}
        }))
        .unwrap();
        assert_eq!(tool.returns, None);
        assert_eq!(tool.parameters["type"], "object");
    }
}
