//! Result payloads for each request method.

use serde::{Deserialize, Serialize};

use super::definitions::{Prompt, Resource, Tool};

/// Result from tools/list.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolListResult {
    pub tools: Vec<Tool>,
}

/// Result from resources/list.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceListResult {
    pub resources: Vec<Resource>,
}

/// Result from resources/read.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceReadResult {
    pub resource: Resource,
}

/// Result from prompts/list.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromptListResult {
    pub prompts: Vec<Prompt>,
}

/// Result from prompts/render.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromptRenderResult {
    pub rendered: String,
}

/// Plain acknowledgement used by resources/write and handler-less tool calls.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusResult {
    pub status: String,
}

impl StatusResult {
    /// The `{"status":"success"}` acknowledgement.
    pub fn success() -> Self {
        Self {
            status: "success".to_string(),
        }
    }
}
