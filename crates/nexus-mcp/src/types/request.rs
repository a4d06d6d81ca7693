//! Typed request parameters and the closed set of request variants.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::capabilities::InitializeParams;
use super::error::{McpError, McpResult};
use super::message::RequestId;
use super::method::Method;

/// Parameters for tools/call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCallParams {
    /// Tool name.
    pub name: String,
    /// Tool arguments.
    #[serde(default)]
    pub arguments: Value,
    /// Optional per-call bound in milliseconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout: Option<u64>,
}

/// Parameters for resources/read.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceReadParams {
    /// Resource URI.
    pub uri: String,
}

/// Parameters for resources/write.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceWriteParams {
    /// Resource URI.
    pub uri: String,
    /// Replacement metadata.
    #[serde(default)]
    pub content: Value,
}

/// Parameters for prompts/render.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromptRenderParams {
    /// Prompt name.
    pub name: String,
    /// Values substituted for `{{key}}` placeholders.
    #[serde(default)]
    pub variables: Map<String, Value>,
}

/// Payload of a `$/notification` message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotificationParams {
    /// Notification category.
    #[serde(rename = "type", default)]
    pub kind: String,
    /// Human-readable text.
    #[serde(default)]
    pub message: String,
    /// Optional structured data.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl NotificationParams {
    pub fn new(kind: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            message: message.into(),
            data: None,
        }
    }
}

/// Parameters for $/cancelRequest.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CancelRequestParams {
    /// The request ID to cancel.
    #[serde(rename = "requestId")]
    pub request_id: RequestId,
    /// Optional reason for cancellation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// An inbound message decoded into its method-specific shape.
#[derive(Debug, Clone)]
pub enum Request {
    Initialize(InitializeParams),
    Initialized,
    ToolsList,
    ToolsCall(ToolCallParams),
    ResourcesList,
    ResourcesRead(ResourceReadParams),
    ResourcesWrite(ResourceWriteParams),
    PromptsList,
    PromptsRender(PromptRenderParams),
    Notification(NotificationParams),
    CancelRequest(CancelRequestParams),
}

impl Request {
    /// Decode `params` for the given method.
    pub fn decode(method: Method, params: Option<Value>) -> McpResult<Self> {
        Ok(match method {
            Method::Initialize => Request::Initialize(decode_params(params, "initialize")?),
            Method::Initialized => Request::Initialized,
            Method::ToolsList => Request::ToolsList,
            Method::ToolsCall => Request::ToolsCall(decode_params(params, "tool call")?),
            Method::ResourcesList => Request::ResourcesList,
            Method::ResourcesRead => {
                Request::ResourcesRead(decode_params(params, "resource read")?)
            }
            Method::ResourcesWrite => {
                Request::ResourcesWrite(decode_params(params, "resource write")?)
            }
            Method::PromptsList => Request::PromptsList,
            Method::PromptsRender => {
                Request::PromptsRender(decode_params(params, "prompt render")?)
            }
            Method::Notification => Request::Notification(decode_params(params, "notification")?),
            Method::CancelRequest => {
                Request::CancelRequest(decode_params(params, "cancel request")?)
            }
        })
    }

    /// The method this variant belongs to.
    pub fn method(&self) -> Method {
        match self {
            Request::Initialize(_) => Method::Initialize,
            Request::Initialized => Method::Initialized,
            Request::ToolsList => Method::ToolsList,
            Request::ToolsCall(_) => Method::ToolsCall,
            Request::ResourcesList => Method::ResourcesList,
            Request::ResourcesRead(_) => Method::ResourcesRead,
            Request::ResourcesWrite(_) => Method::ResourcesWrite,
            Request::PromptsList => Method::PromptsList,
            Request::PromptsRender(_) => Method::PromptsRender,
            Request::Notification(_) => Method::Notification,
            Request::CancelRequest(_) => Method::CancelRequest,
        }
    }

    /// Encode the variant's parameters for the wire.
    pub fn to_params(&self) -> McpResult<Option<Value>> {
        let value = match self {
            Request::Initialize(p) => serde_json::to_value(p)?,
            Request::ToolsCall(p) => serde_json::to_value(p)?,
            Request::ResourcesRead(p) => serde_json::to_value(p)?,
            Request::ResourcesWrite(p) => serde_json::to_value(p)?,
            Request::PromptsRender(p) => serde_json::to_value(p)?,
            Request::Notification(p) => serde_json::to_value(p)?,
            Request::CancelRequest(p) => serde_json::to_value(p)?,
            Request::Initialized
            | Request::ToolsList
            | Request::ResourcesList
            | Request::PromptsList => return Ok(None),
        };
        Ok(Some(value))
    }
}

/// Decode method parameters, treating absent params as an empty object.
fn decode_params<T: DeserializeOwned>(params: Option<Value>, what: &str) -> McpResult<T> {
    let value = params.unwrap_or_else(|| Value::Object(Map::new()));
    serde_json::from_value(value)
        .map_err(|e| McpError::InvalidParams(format!("invalid {what} params: {e}")))
}
