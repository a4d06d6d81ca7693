//! The MCP message envelope shared by requests, responses, and notifications.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::method::Method;

/// Envelope version string carried on every message.
pub const PROTOCOL_VERSION: &str = "2.0";

/// Request identifier. Numeric for ids issued by a peer session; any
/// string id a remote chooses is echoed back unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RequestId {
    /// Numeric identifier.
    Number(i64),
    /// String identifier.
    String(String),
}

impl std::fmt::Display for RequestId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RequestId::Number(n) => write!(f, "{n}"),
            RequestId::String(s) => write!(f, "{s}"),
        }
    }
}

impl From<i64> for RequestId {
    fn from(n: i64) -> Self {
        RequestId::Number(n)
    }
}

/// Error object carried on a failed response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorObject {
    /// Numeric error code.
    pub code: i32,
    /// Human-readable error message.
    pub message: String,
    /// Optional additional data.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

/// A single protocol message.
///
/// The same shape is used in both directions. `id` is present on correlated
/// requests and their responses and absent on notifications; a response
/// carries exactly one of `result` / `error`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// Envelope version, always [`PROTOCOL_VERSION`] on messages we build.
    #[serde(
        rename = "jsonrpc",
        alias = "protocolVersion",
        default = "default_protocol_version"
    )]
    pub protocol_version: String,
    /// Correlation id.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<RequestId>,
    /// Method name; absent on responses.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,
    /// Request or notification parameters.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
    /// Success payload.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    /// Failure payload.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorObject>,
}

fn default_protocol_version() -> String {
    PROTOCOL_VERSION.to_string()
}

impl Message {
    fn empty() -> Self {
        Self {
            protocol_version: PROTOCOL_VERSION.to_string(),
            id: None,
            method: None,
            params: None,
            result: None,
            error: None,
        }
    }

    /// Build a correlated request.
    pub fn request(id: RequestId, method: Method, params: Option<Value>) -> Self {
        Self {
            id: Some(id),
            method: Some(method.as_str().to_string()),
            params,
            ..Self::empty()
        }
    }

    /// Build an uncorrelated notification.
    pub fn notification(method: Method, params: Option<Value>) -> Self {
        Self {
            method: Some(method.as_str().to_string()),
            params,
            ..Self::empty()
        }
    }

    /// Build a success response echoing `id`.
    pub fn response(id: Option<RequestId>, result: Value) -> Self {
        Self {
            id,
            result: Some(result),
            ..Self::empty()
        }
    }

    /// Build an error response echoing `id`.
    pub fn error_response(id: Option<RequestId>, code: i32, message: impl Into<String>) -> Self {
        Self {
            id,
            error: Some(ErrorObject {
                code,
                message: message.into(),
                data: None,
            }),
            ..Self::empty()
        }
    }

    /// The method name, or `""` for responses.
    pub fn method_name(&self) -> &str {
        self.method.as_deref().unwrap_or("")
    }

    /// Whether this message answers an earlier request.
    pub fn is_response(&self) -> bool {
        self.method.is_none() && self.id.is_some()
    }

    /// Whether this message expects no reply.
    pub fn is_notification(&self) -> bool {
        self.method.is_some() && self.id.is_none()
    }
}
