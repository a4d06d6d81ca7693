//! The fixed method vocabulary.

use std::fmt;
use std::str::FromStr;

use super::error::McpError;

/// Every method name the engine understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    /// Capability negotiation request.
    Initialize,
    /// Handshake-complete notification.
    Initialized,
    /// List registered tools.
    ToolsList,
    /// Invoke a registered tool.
    ToolsCall,
    /// List registered resources.
    ResourcesList,
    /// Read one resource by URI.
    ResourcesRead,
    /// Overwrite a resource's metadata.
    ResourcesWrite,
    /// List registered prompts.
    PromptsList,
    /// Render a prompt template.
    PromptsRender,
    /// Generic out-of-band notification.
    Notification,
    /// Request cancellation notice.
    CancelRequest,
}

/// Whether a method is answered or only consumed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MethodClass {
    /// Correlated: the receiver writes exactly one response.
    Request,
    /// Uncorrelated: the receiver writes nothing back.
    Notification,
}

impl Method {
    /// All methods, in catalogue order.
    pub const ALL: [Method; 11] = [
        Method::Initialize,
        Method::Initialized,
        Method::ToolsList,
        Method::ToolsCall,
        Method::ResourcesList,
        Method::ResourcesRead,
        Method::ResourcesWrite,
        Method::PromptsList,
        Method::PromptsRender,
        Method::Notification,
        Method::CancelRequest,
    ];

    /// Wire spelling.
    pub fn as_str(self) -> &'static str {
        match self {
            Method::Initialize => "initialize",
            Method::Initialized => "initialized",
            Method::ToolsList => "tools/list",
            Method::ToolsCall => "tools/call",
            Method::ResourcesList => "resources/list",
            Method::ResourcesRead => "resources/read",
            Method::ResourcesWrite => "resources/write",
            Method::PromptsList => "prompts/list",
            Method::PromptsRender => "prompts/render",
            Method::Notification => "$/notification",
            Method::CancelRequest => "$/cancelRequest",
        }
    }

    pub fn class(self) -> MethodClass {
        match self {
            Method::Initialized | Method::Notification | Method::CancelRequest => {
                MethodClass::Notification
            }
            _ => MethodClass::Request,
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Method {
    type Err = McpError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Method::ALL
            .iter()
            .copied()
            .find(|m| m.as_str() == s)
            .ok_or_else(|| McpError::MethodNotFound(s.to_string()))
    }
}
