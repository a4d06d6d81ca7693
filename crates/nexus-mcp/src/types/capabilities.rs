//! Capability documents and initialization payloads.

use serde::{Deserialize, Serialize};

/// Server name constant.
pub const SERVER_NAME: &str = "nexus-mcp";

/// Server version constant.
pub const SERVER_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Implementation info for the host.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Implementation {
    /// Name of the implementation.
    pub name: String,
    /// Version string.
    pub version: String,
}

/// Tool operations a peer intends to use.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolsClientCapabilities {
    #[serde(default)]
    pub call: bool,
    #[serde(default)]
    pub list: bool,
}

/// Resource operations a peer intends to use.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourcesClientCapabilities {
    #[serde(default)]
    pub read: bool,
    #[serde(default)]
    pub write: bool,
    #[serde(default)]
    pub list: bool,
}

/// Prompt operations a peer intends to use.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromptsClientCapabilities {
    #[serde(default)]
    pub render: bool,
    #[serde(default)]
    pub list: bool,
}

/// Capabilities declared by a peer during `initialize`.
///
/// These are recorded for the connection but not enforced: each handler
/// validates its own preconditions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientCapabilities {
    #[serde(default)]
    pub tools: ToolsClientCapabilities,
    #[serde(default)]
    pub resources: ResourcesClientCapabilities,
    #[serde(default)]
    pub prompts: PromptsClientCapabilities,
}

impl ClientCapabilities {
    /// Every operation flag set.
    pub fn all() -> Self {
        Self {
            tools: ToolsClientCapabilities {
                call: true,
                list: true,
            },
            resources: ResourcesClientCapabilities {
                read: true,
                write: true,
                list: true,
            },
            prompts: PromptsClientCapabilities {
                render: true,
                list: true,
            },
        }
    }
}

/// Host support for one category.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryCapability {
    /// Whether the category is available at all.
    #[serde(default)]
    pub supported: bool,
    /// Supported sub-types within the category.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub types: Vec<String>,
}

impl CategoryCapability {
    fn supported(types: &[&str]) -> Self {
        Self {
            supported: true,
            types: types.iter().map(|t| t.to_string()).collect(),
        }
    }
}

/// Capabilities advertised by the host in its `initialize` result.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerCapabilities {
    #[serde(default)]
    pub tools: CategoryCapability,
    #[serde(default)]
    pub resources: CategoryCapability,
    #[serde(default)]
    pub prompts: CategoryCapability,
}

impl ServerCapabilities {
    /// The fixed capability document this host answers with.
    pub fn default_capabilities() -> Self {
        Self {
            tools: CategoryCapability::supported(&["function"]),
            resources: CategoryCapability::supported(&["file", "memory"]),
            prompts: CategoryCapability::supported(&["text", "chat"]),
        }
    }
}

/// Initialize request parameters from a peer.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitializeParams {
    /// Opaque root context for the connection.
    #[serde(default)]
    pub root_uri: String,
    /// Declared peer capabilities.
    #[serde(default)]
    pub capabilities: ClientCapabilities,
}

/// Initialize response result from the host.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitializeResult {
    /// Host capabilities.
    pub capabilities: ServerCapabilities,
    /// Host implementation info.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub server_info: Option<Implementation>,
}

impl InitializeResult {
    /// Build the default initialization result.
    pub fn default_result() -> Self {
        Self {
            capabilities: ServerCapabilities::default_capabilities(),
            server_info: Some(Implementation {
                name: SERVER_NAME.to_string(),
                version: SERVER_VERSION.to_string(),
            }),
        }
    }
}
