//! Inbound message dispatch for the host side.

use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;

use crate::host::connections::ConnectionTable;
use crate::prompts;
use crate::registry::Registries;
use crate::tools::{RequestContext, ToolExecutor};
use crate::types::{
    McpError, McpResult, Message, Method, MethodClass, Prompt, PromptListResult,
    PromptRenderResult, Request, Resource, ResourceListResult, ResourceReadResult,
    StatusResult, Tool, ToolListResult,
};

use super::negotiation::ConnectionId;

/// Default per-request bound.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Knobs that shape how requests are handled.
#[derive(Debug, Clone, Copy)]
pub struct HandlerOptions {
    /// Upper bound on each request's handler.
    pub request_timeout: Duration,
    /// Reject operations that arrive before the handshake completes.
    pub strict_handshake: bool,
}

impl Default for HandlerOptions {
    fn default() -> Self {
        Self {
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            strict_handshake: false,
        }
    }
}

/// Routes decoded messages to their handlers and builds responses.
///
/// The method catalogue is a closed enum, so the routing table is fixed at
/// compile time; nothing registers handlers at runtime.
#[derive(Debug)]
pub struct ProtocolHandler {
    registries: Arc<Registries>,
    tools: Arc<ToolExecutor>,
    connections: Arc<ConnectionTable>,
    options: HandlerOptions,
}

impl ProtocolHandler {
    pub fn new(
        registries: Arc<Registries>,
        tools: Arc<ToolExecutor>,
        connections: Arc<ConnectionTable>,
        options: HandlerOptions,
    ) -> Self {
        Self {
            registries,
            tools,
            connections,
            options,
        }
    }

    pub fn registries(&self) -> &Arc<Registries> {
        &self.registries
    }

    pub fn tools(&self) -> &Arc<ToolExecutor> {
        &self.tools
    }

    pub fn connections(&self) -> &Arc<ConnectionTable> {
        &self.connections
    }

    pub fn options(&self) -> HandlerOptions {
        self.options
    }

    /// Handle one inbound message from `connection`.
    ///
    /// Returns the message to write back, or `None` when nothing should be
    /// written (notifications, stray responses).
    pub async fn handle_message(&self, connection: ConnectionId, msg: Message) -> Option<Message> {
        let id = msg.id.clone();

        let Some(method_name) = msg.method.as_deref() else {
            tracing::warn!(
                connection = %connection,
                id = ?id,
                "Discarding message without a method"
            );
            return None;
        };

        let method = match method_name.parse::<Method>() {
            Ok(method) => method,
            Err(e) => {
                tracing::warn!(connection = %connection, method = %method_name, "Method not found");
                return Some(e.to_response(id));
            }
        };

        tracing::debug!(connection = %connection, method = %method, id = ?id, "Dispatching");

        let timeout = self.options.request_timeout;
        let outcome = tokio::time::timeout(timeout, self.dispatch(connection, method, msg.params))
            .await
            .unwrap_or(Err(McpError::Timeout(timeout)));

        match outcome {
            Ok(Some(result)) => Some(Message::response(id, result)),
            Ok(None) => None,
            Err(e) if method.class() == MethodClass::Notification => {
                tracing::warn!(connection = %connection, method = %method, "Notification failed: {e}");
                None
            }
            Err(e) => {
                tracing::debug!(connection = %connection, method = %method, "Request failed: {e}");
                Some(e.to_response(id))
            }
        }
    }

    async fn dispatch(
        &self,
        connection: ConnectionId,
        method: Method,
        params: Option<Value>,
    ) -> McpResult<Option<Value>> {
        let request = Request::decode(method, params)?;

        if self.options.strict_handshake && requires_handshake(method) {
            self.connections
                .with_state(connection, |state| state.ensure_initialized())
                .await??;
        }

        let result = match request {
            Request::Initialize(params) => {
                let result = self
                    .connections
                    .with_state(connection, |state| state.negotiate(params))
                    .await??;
                serde_json::to_value(result)?
            }
            Request::Initialized => {
                self.connections
                    .with_state(connection, |state| state.mark_initialized())
                    .await?;
                return Ok(None);
            }
            Request::ToolsList => serde_json::to_value(ToolListResult {
                tools: self.registries.list::<Tool>().await,
            })?,
            Request::ToolsCall(params) => {
                let tool: Tool = self.registries.require(&params.name).await?;
                let ctx = self.request_context(connection, params.timeout).await?;
                self.tools.execute(&tool, ctx, params.arguments).await?
            }
            Request::ResourcesList => serde_json::to_value(ResourceListResult {
                resources: self.registries.list::<Resource>().await,
            })?,
            Request::ResourcesRead(params) => serde_json::to_value(ResourceReadResult {
                resource: self.registries.require(&params.uri).await?,
            })?,
            Request::ResourcesWrite(params) => {
                self.registries
                    .write_resource_metadata(&params.uri, params.content)
                    .await?;
                serde_json::to_value(StatusResult::success())?
            }
            Request::PromptsList => serde_json::to_value(PromptListResult {
                prompts: self.registries.list::<Prompt>().await,
            })?,
            Request::PromptsRender(params) => {
                let prompt: Prompt = self.registries.require(&params.name).await?;
                serde_json::to_value(PromptRenderResult {
                    rendered: prompts::render(&prompt.template, &params.variables),
                })?
            }
            Request::Notification(params) => {
                tracing::info!(
                    connection = %connection,
                    kind = %params.kind,
                    "Peer notification: {}",
                    params.message
                );
                return Ok(None);
            }
            Request::CancelRequest(params) => {
                // Requests on a connection run in order, so the target has
                // already been answered by the time this is read.
                tracing::debug!(
                    connection = %connection,
                    request = %params.request_id,
                    "Ignoring cancellation of completed request"
                );
                return Ok(None);
            }
        };

        Ok(Some(result))
    }

    async fn request_context(
        &self,
        connection: ConnectionId,
        timeout_ms: Option<u64>,
    ) -> McpResult<RequestContext> {
        let root_uri = self
            .connections
            .with_state(connection, |state| state.root_uri.clone())
            .await?;
        let ctx = RequestContext::new(connection, root_uri, self.options.request_timeout);
        Ok(match timeout_ms {
            Some(ms) => ctx.with_timeout(Duration::from_millis(ms)),
            None => ctx,
        })
    }
}

/// Operations gated by strict handshake mode.
fn requires_handshake(method: Method) -> bool {
    method.class() == MethodClass::Request && method != Method::Initialize
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ClientCapabilities, InitializeParams, RequestId};
    use serde_json::json;

    async fn handler_with(options: HandlerOptions) -> (ProtocolHandler, ConnectionId) {
        let connections = Arc::new(ConnectionTable::new());
        let connection = connections.open(None).await;
        let handler = ProtocolHandler::new(
            Arc::new(Registries::new()),
            Arc::new(ToolExecutor::new()),
            connections,
            options,
        );
        (handler, connection)
    }

    fn request(id: i64, method: Method, params: Option<Value>) -> Message {
        Message::request(RequestId::Number(id), method, params)
    }

    #[tokio::test]
    async fn unknown_method_answers_method_not_found() {
        let (handler, conn) = handler_with(HandlerOptions::default()).await;
        let mut msg = request(1, Method::ToolsList, None);
        msg.method = Some("tools/delete".to_string());

        let response = handler.handle_message(conn, msg).await.unwrap();
        let error = response.error.unwrap();
        assert_eq!(error.code, -32601);
        assert_eq!(error.message, "method not found");
        assert_eq!(response.id, Some(RequestId::Number(1)));
    }

    #[tokio::test]
    async fn initialized_writes_nothing() {
        let (handler, conn) = handler_with(HandlerOptions::default()).await;
        let msg = Message::notification(Method::Initialized, None);
        assert!(handler.handle_message(conn, msg).await.is_none());
    }

    #[tokio::test]
    async fn strict_mode_rejects_before_ready() {
        let options = HandlerOptions {
            strict_handshake: true,
            ..HandlerOptions::default()
        };
        let (handler, conn) = handler_with(options).await;

        let response = handler
            .handle_message(conn, request(1, Method::ToolsList, None))
            .await
            .unwrap();
        assert_eq!(response.error.unwrap().code, -32000);

        let init = InitializeParams {
            root_uri: "file:///w".into(),
            capabilities: ClientCapabilities::all(),
        };
        let response = handler
            .handle_message(
                conn,
                request(2, Method::Initialize, Some(serde_json::to_value(init).unwrap())),
            )
            .await
            .unwrap();
        assert!(response.result.is_some());
        handler
            .handle_message(conn, Message::notification(Method::Initialized, None))
            .await;

        let response = handler
            .handle_message(conn, request(3, Method::ToolsList, None))
            .await
            .unwrap();
        assert_eq!(response.result.unwrap(), json!({"tools": []}));
    }

    #[tokio::test]
    async fn bad_params_surface_as_handler_error() {
        let (handler, conn) = handler_with(HandlerOptions::default()).await;
        let response = handler
            .handle_message(conn, request(4, Method::ToolsCall, Some(json!({"arguments": {}}))))
            .await
            .unwrap();
        let error = response.error.unwrap();
        assert_eq!(error.code, -32000);
        assert!(error.message.contains("invalid tool call params"));
    }
}
