//! Error types and wire error codes.

use thiserror::Error;

use super::message::{ErrorObject, Message, RequestId};

/// Standard JSON-RPC error codes used by the engine.
pub mod error_codes {
    /// Frame could not be decoded.
    pub const PARSE_ERROR: i32 = -32700;
    /// No handler for the requested method.
    pub const METHOD_NOT_FOUND: i32 = -32601;
}

/// Engine-specific error codes.
pub mod mcp_error_codes {
    /// Any failure reported by a method handler. The message text is the
    /// only detail; it is not meant to be machine-parsed.
    pub const HANDLER_ERROR: i32 = -32000;
}

/// Wire message for [`McpError::MethodNotFound`].
pub const METHOD_NOT_FOUND_MESSAGE: &str = "method not found";

/// Errors produced anywhere in the engine.
#[derive(Debug, Error)]
pub enum McpError {
    /// Inbound frame was not a valid message.
    #[error("parse error: {0}")]
    Parse(String),

    /// No handler exists for the method.
    #[error("method not found: {0}")]
    MethodNotFound(String),

    /// Parameters failed to decode or validate.
    #[error("invalid params: {0}")]
    InvalidParams(String),

    /// The request is not acceptable in the current connection state.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// A registry already holds this key.
    #[error("{kind} {key} already registered")]
    DuplicateKey { kind: &'static str, key: String },

    /// A registry holds no entry for this key.
    #[error("{kind} {key} not found")]
    NotFound { kind: &'static str, key: String },

    /// A bound tool handler reported failure.
    #[error("tool {tool} failed: {message}")]
    ToolExecution { tool: String, message: String },

    /// A request exceeded its deadline on the host.
    #[error("request timed out after {0:?}")]
    Timeout(std::time::Duration),

    /// Transport-level failure.
    #[error("transport error: {0}")]
    Transport(String),

    /// I/O error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON (de)serialization failure outside of parameter decoding.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// The remote side answered with an error response.
    #[error("remote error {code}: {message}")]
    Remote { code: i32, message: String },

    /// The caller stopped waiting for a response.
    #[error("request canceled: {0}")]
    Canceled(String),

    /// The connection closed while the request was outstanding.
    #[error("connection closed")]
    ConnectionClosed,

    /// An endpoint operation was called in the wrong lifecycle state.
    #[error("{0}")]
    Lifecycle(String),

    /// Configuration could not be loaded.
    #[error("config error: {0}")]
    Config(String),

    /// Invariant violation inside the engine.
    #[error("internal error: {0}")]
    Internal(String),
}

impl McpError {
    /// Wire code for this error.
    pub fn code(&self) -> i32 {
        match self {
            McpError::Parse(_) => error_codes::PARSE_ERROR,
            McpError::MethodNotFound(_) => error_codes::METHOD_NOT_FOUND,
            McpError::Remote { code, .. } => *code,
            _ => mcp_error_codes::HANDLER_ERROR,
        }
    }

    /// Wire message for this error. Method-not-found uses the fixed text;
    /// everything else carries its display string.
    pub fn wire_message(&self) -> String {
        match self {
            McpError::MethodNotFound(_) => METHOD_NOT_FOUND_MESSAGE.to_string(),
            other => other.to_string(),
        }
    }

    /// Convert into a wire error object.
    pub fn to_error_object(&self) -> ErrorObject {
        ErrorObject {
            code: self.code(),
            message: self.wire_message(),
            data: None,
        }
    }

    /// Convert into an error response echoing `id`.
    pub fn to_response(&self, id: Option<RequestId>) -> Message {
        Message::error_response(id, self.code(), self.wire_message())
    }

    /// Shorthand for a missing registry key.
    pub fn not_found(kind: &'static str, key: impl Into<String>) -> Self {
        McpError::NotFound {
            kind,
            key: key.into(),
        }
    }

    /// Shorthand for a duplicate registry key.
    pub fn duplicate(kind: &'static str, key: impl Into<String>) -> Self {
        McpError::DuplicateKey {
            kind,
            key: key.into(),
        }
    }
}

impl From<ErrorObject> for McpError {
    fn from(e: ErrorObject) -> Self {
        McpError::Remote {
            code: e.code,
            message: e.message,
        }
    }
}

/// Convenience result alias.
pub type McpResult<T> = Result<T, McpError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn method_not_found_uses_fixed_text() {
        let msg = McpError::MethodNotFound("tools/delete".into()).to_response(Some(1.into()));
        let err = msg.error.unwrap();
        assert_eq!(err.code, -32601);
        assert_eq!(err.message, "method not found");
    }

    #[test]
    fn handler_errors_share_one_code() {
        assert_eq!(McpError::not_found("tool", "x").code(), -32000);
        assert_eq!(McpError::duplicate("tool", "x").code(), -32000);
        assert_eq!(McpError::InvalidParams("bad".into()).code(), -32000);
    }

    #[test]
    fn not_found_message_names_the_key() {
        let err = McpError::not_found("resource", "file:///a");
        assert_eq!(err.to_string(), "resource file:///a not found");
    }
}
