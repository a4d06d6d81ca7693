//! The calling side: one outbound connection, correlated requests, and
//! notification delivery.

mod actor;

use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;
use tokio::sync::{mpsc, oneshot};
use tokio_util::sync::CancellationToken;

use crate::transport::{split_tcp, MessageReader, MessageWriter};
use crate::types::{
    ClientCapabilities, InitializeParams, InitializeResult, McpError, McpResult, Message, Method,
    NotificationParams, Prompt, PromptListResult, PromptRenderParams, PromptRenderResult, RequestId,
    Resource, ResourceListResult, ResourceReadParams, ResourceReadResult, ResourceWriteParams,
    ServerCapabilities, Tool, ToolCallParams, ToolListResult,
};

use actor::Command;

/// Receives `$/notification` messages pushed by the host.
///
/// Each notification runs on its own task, so handlers may complete out of
/// order.
#[async_trait]
pub trait NotificationHandler: Send + Sync + 'static {
    async fn on_notification(&self, params: NotificationParams);
}

#[async_trait]
impl<F> NotificationHandler for F
where
    F: Fn(NotificationParams) + Send + Sync + 'static,
{
    async fn on_notification(&self, params: NotificationParams) {
        self(params)
    }
}

/// A client connection to a host.
///
/// Requests may be issued concurrently from any number of tasks; each
/// caller receives exactly the response matching its own id.
pub struct PeerSession {
    commands: mpsc::UnboundedSender<Command>,
    next_id: AtomicI64,
    capabilities: ClientCapabilities,
}

/// Removes a pending entry if the waiting future goes away early.
struct PendingGuard<'a> {
    id: i64,
    commands: &'a mpsc::UnboundedSender<Command>,
    armed: bool,
}

impl Drop for PendingGuard<'_> {
    fn drop(&mut self) {
        if self.armed {
            let _ = self.commands.send(Command::Forget { id: self.id });
        }
    }
}

impl PeerSession {
    /// Dial a host over TCP.
    pub async fn connect(addr: &str, capabilities: ClientCapabilities) -> McpResult<Self> {
        let stream = TcpStream::connect(addr)
            .await
            .map_err(|e| McpError::Transport(format!("connect to {addr} failed: {e}")))?;
        tracing::info!(%addr, "Connected to host");
        let (reader, writer) = split_tcp(stream);
        Ok(Self::from_parts(reader, writer, capabilities))
    }

    /// Run a session over an already-established stream.
    pub fn from_parts<R, W>(
        reader: MessageReader<R>,
        writer: MessageWriter<W>,
        capabilities: ClientCapabilities,
    ) -> Self
    where
        R: AsyncRead + Unpin + Send + 'static,
        W: AsyncWrite + Unpin + Send + 'static,
    {
        Self {
            commands: actor::spawn(reader, writer),
            next_id: AtomicI64::new(1),
            capabilities,
        }
    }

    pub fn capabilities(&self) -> ClientCapabilities {
        self.capabilities
    }

    /// Install the handler for host notifications, replacing any previous one.
    pub fn on_notification(&self, handler: Arc<dyn NotificationHandler>) {
        let _ = self.commands.send(Command::SetHandler(handler));
    }

    pub fn is_closed(&self) -> bool {
        self.commands.is_closed()
    }

    /// Send a request and wait for its result with no deadline.
    pub async fn request(&self, method: Method, params: Option<Value>) -> McpResult<Value> {
        self.send_request(method, params, None, None)
            .await
            .map(into_result)
    }

    /// Send a request, giving up with [`McpError::Canceled`] after `timeout`.
    pub async fn request_with_timeout(
        &self,
        method: Method,
        params: Option<Value>,
        timeout: Duration,
    ) -> McpResult<Value> {
        self.send_request(method, params, Some(timeout), None)
            .await
            .map(into_result)
    }

    /// Send a request, giving up with [`McpError::Canceled`] when `cancel` fires.
    pub async fn request_with_cancel(
        &self,
        method: Method,
        params: Option<Value>,
        cancel: CancellationToken,
    ) -> McpResult<Value> {
        self.send_request(method, params, None, Some(cancel))
            .await
            .map(into_result)
    }

    /// Send a request and return the raw response envelope.
    ///
    /// A response carrying an `error` becomes [`McpError::Remote`]. The
    /// pending entry is gone by the time this returns, whatever the outcome.
    pub async fn send_request(
        &self,
        method: Method,
        params: Option<Value>,
        timeout: Option<Duration>,
        cancel: Option<CancellationToken>,
    ) -> McpResult<Message> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (reply_tx, reply_rx) = oneshot::channel();
        let message = Message::request(RequestId::Number(id), method, params);

        tracing::debug!(id, method = %method, "Sending request");
        self.commands
            .send(Command::Request {
                id,
                message,
                reply: reply_tx,
            })
            .map_err(|_| McpError::ConnectionClosed)?;
        let mut guard = PendingGuard {
            id,
            commands: &self.commands,
            armed: true,
        };

        let deadline = async {
            match timeout {
                Some(timeout) => tokio::time::sleep(timeout).await,
                None => std::future::pending::<()>().await,
            }
        };
        let canceled = async {
            match &cancel {
                Some(token) => token.cancelled().await,
                None => std::future::pending::<()>().await,
            }
        };

        let reply = tokio::select! {
            reply = reply_rx => reply,
            _ = deadline => {
                return Err(McpError::Canceled(format!(
                    "request {id} timed out after {:?}",
                    timeout.unwrap_or_default()
                )));
            }
            _ = canceled => {
                return Err(McpError::Canceled(format!("request {id} canceled")));
            }
        };
        guard.armed = false;

        let mut message = reply.map_err(|_| McpError::ConnectionClosed)??;
        if let Some(error) = message.error.take() {
            tracing::debug!(id, code = error.code, "Remote rejected request");
            return Err(error.into());
        }
        Ok(message)
    }

    /// Write a message that expects no response.
    pub async fn send_notification(&self, method: Method, params: Option<Value>) -> McpResult<()> {
        let (done_tx, done_rx) = oneshot::channel();
        self.commands
            .send(Command::Notify {
                message: Message::notification(method, params),
                done: done_tx,
            })
            .map_err(|_| McpError::ConnectionClosed)?;
        done_rx.await.map_err(|_| McpError::ConnectionClosed)?
    }

    /// Push a `$/notification` to the host.
    pub async fn notify(&self, params: NotificationParams) -> McpResult<()> {
        self.send_notification(Method::Notification, Some(serde_json::to_value(params)?))
            .await
    }

    /// Run the handshake: `initialize`, then `initialized`.
    ///
    /// Returns the host's capability document.
    pub async fn initialize(&self, root_uri: impl Into<String>) -> McpResult<ServerCapabilities> {
        let params = InitializeParams {
            root_uri: root_uri.into(),
            capabilities: self.capabilities,
        };
        let result: InitializeResult = self.call(Method::Initialize, &params).await?;
        self.send_notification(Method::Initialized, None).await?;

        tracing::info!("Handshake complete");
        Ok(result.capabilities)
    }

    pub async fn list_tools(&self) -> McpResult<Vec<Tool>> {
        let result: ToolListResult = decode(self.request(Method::ToolsList, None).await?)?;
        Ok(result.tools)
    }

    pub async fn call_tool(&self, name: impl Into<String>, arguments: Value) -> McpResult<Value> {
        let params = ToolCallParams {
            name: name.into(),
            arguments,
            timeout: None,
        };
        self.call(Method::ToolsCall, &params).await
    }

    /// Call a tool and ask the host to bound it by `timeout` as well.
    pub async fn call_tool_with_timeout(
        &self,
        name: impl Into<String>,
        arguments: Value,
        timeout: Duration,
    ) -> McpResult<Value> {
        let params = ToolCallParams {
            name: name.into(),
            arguments,
            timeout: Some(u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX)),
        };
        self.request_with_timeout(Method::ToolsCall, Some(serde_json::to_value(params)?), timeout)
            .await
    }

    pub async fn list_resources(&self) -> McpResult<Vec<Resource>> {
        let result: ResourceListResult = decode(self.request(Method::ResourcesList, None).await?)?;
        Ok(result.resources)
    }

    pub async fn read_resource(&self, uri: impl Into<String>) -> McpResult<Resource> {
        let params = ResourceReadParams { uri: uri.into() };
        let result: ResourceReadResult = self.call(Method::ResourcesRead, &params).await?;
        Ok(result.resource)
    }

    /// Replace a resource's metadata on the host.
    pub async fn write_resource(&self, uri: impl Into<String>, content: Value) -> McpResult<()> {
        let params = ResourceWriteParams {
            uri: uri.into(),
            content,
        };
        let _: Value = self.call(Method::ResourcesWrite, &params).await?;
        Ok(())
    }

    pub async fn list_prompts(&self) -> McpResult<Vec<Prompt>> {
        let result: PromptListResult = decode(self.request(Method::PromptsList, None).await?)?;
        Ok(result.prompts)
    }

    pub async fn render_prompt(
        &self,
        name: impl Into<String>,
        variables: Map<String, Value>,
    ) -> McpResult<String> {
        let params = PromptRenderParams {
            name: name.into(),
            variables,
        };
        let result: PromptRenderResult = self.call(Method::PromptsRender, &params).await?;
        Ok(result.rendered)
    }

    /// Close the connection. Every outstanding request fails with
    /// [`McpError::ConnectionClosed`], as does every later one.
    pub async fn close(&self) {
        let (done_tx, done_rx) = oneshot::channel();
        if self.commands.send(Command::Close { done: Some(done_tx) }).is_ok() {
            let _ = done_rx.await;
        }
    }

    async fn call<P, T>(&self, method: Method, params: &P) -> McpResult<T>
    where
        P: serde::Serialize,
        T: DeserializeOwned,
    {
        let params = serde_json::to_value(params)?;
        decode(self.request(method, Some(params)).await?)
    }
}

impl Drop for PeerSession {
    fn drop(&mut self) {
        let _ = self.commands.send(Command::Close { done: None });
    }
}

impl std::fmt::Debug for PeerSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PeerSession")
            .field("next_id", &self.next_id)
            .field("closed", &self.is_closed())
            .finish()
    }
}

fn into_result(message: Message) -> Value {
    message.result.unwrap_or(Value::Null)
}

fn decode<T: DeserializeOwned>(value: Value) -> McpResult<T> {
    Ok(serde_json::from_value(value)?)
}
