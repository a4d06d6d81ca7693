//! The serving side: registries, a listener, and one task per connection.

pub(crate) mod connection;
pub mod connections;

use std::sync::Arc;

use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpListener;
use tokio::sync::mpsc::error::TrySendError;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::config::ServerConfig;
use crate::prompts::PromptSource;
use crate::protocol::{ConnectionId, HandlerOptions, ProtocolHandler};
use crate::registry::Registries;
use crate::tools::{ToolExecutor, ToolHandler};
use crate::transport::{split_tcp, MessageReader, MessageWriter, DEFAULT_MAX_FRAME_BYTES};
use crate::types::{McpError, McpResult, Message, Method, NotificationParams, Prompt, Resource, Tool};

pub use connections::{ConnectionSummary, ConnectionTable};

/// A host serving tools, resources, and prompts to any number of peers.
///
/// Cloning is cheap; clones share registries, connections, and the
/// shutdown signal.
#[derive(Debug, Clone)]
pub struct HostSession {
    handler: Arc<ProtocolHandler>,
    max_frame_bytes: usize,
    shutdown: CancellationToken,
}

impl Default for HostSession {
    fn default() -> Self {
        Self::new(HandlerOptions::default())
    }
}

impl HostSession {
    pub fn new(options: HandlerOptions) -> Self {
        let handler = ProtocolHandler::new(
            Arc::new(Registries::new()),
            Arc::new(ToolExecutor::new()),
            Arc::new(ConnectionTable::new()),
            options,
        );
        Self {
            handler: Arc::new(handler),
            max_frame_bytes: DEFAULT_MAX_FRAME_BYTES,
            shutdown: CancellationToken::new(),
        }
    }

    /// Build a host from config and register its seed entries.
    pub async fn from_config(config: &ServerConfig) -> McpResult<Self> {
        let mut host = Self::new(config.handler_options());
        host.max_frame_bytes = config.max_frame_bytes;

        for tool in &config.tools {
            host.register_tool(tool.clone()).await?;
        }
        for resource in &config.resources {
            host.register_resource(resource.clone()).await?;
        }
        host.load_prompts(config).await?;

        Ok(host)
    }

    pub fn handler(&self) -> &Arc<ProtocolHandler> {
        &self.handler
    }

    pub fn registries(&self) -> &Arc<Registries> {
        self.handler.registries()
    }

    pub async fn register_tool(&self, tool: Tool) -> McpResult<()> {
        tracing::debug!(tool = %tool.name, "Registering tool");
        self.registries().add(tool).await
    }

    pub async fn register_resource(&self, resource: Resource) -> McpResult<()> {
        tracing::debug!(uri = %resource.uri, "Registering resource");
        self.registries().add(resource).await
    }

    pub async fn register_prompt(&self, prompt: Prompt) -> McpResult<()> {
        tracing::debug!(prompt = %prompt.name, "Registering prompt");
        self.registries().add(prompt).await
    }

    /// Remove a tool and any handler bound to it.
    pub async fn remove_tool(&self, name: &str) -> McpResult<Tool> {
        let tool = self.registries().remove::<Tool>(name).await?;
        self.handler.tools().unbind(name).await;
        Ok(tool)
    }

    pub async fn remove_resource(&self, uri: &str) -> McpResult<Resource> {
        self.registries().remove(uri).await
    }

    pub async fn remove_prompt(&self, name: &str) -> McpResult<Prompt> {
        self.registries().remove(name).await
    }

    /// Register every prompt `source` provides. Stops at the first duplicate.
    pub async fn load_prompts(&self, source: &dyn PromptSource) -> McpResult<usize> {
        let prompts = source.load_prompts()?;
        let count = prompts.len();
        for prompt in prompts {
            self.register_prompt(prompt).await?;
        }
        Ok(count)
    }

    /// Attach executable behavior to a registered tool.
    pub async fn bind_tool_handler(&self, name: &str, handler: Arc<dyn ToolHandler>) -> McpResult<()> {
        let tool = self
            .registries()
            .get::<Tool>(name)
            .await
            .ok_or_else(|| McpError::not_found("tool", name))?;
        if self.handler.tools().bind(&tool, handler).await?.is_some() {
            tracing::debug!(tool = %name, "Replaced tool handler");
        }
        Ok(())
    }

    /// Bind `addr` and serve until shutdown.
    pub async fn listen(&self, addr: &str) -> McpResult<()> {
        let listener = TcpListener::bind(addr).await?;
        self.serve(listener).await
    }

    /// Accept connections on `listener` until shutdown.
    ///
    /// Each connection runs on its own task; a failing connection never
    /// affects the others.
    pub async fn serve(&self, listener: TcpListener) -> McpResult<()> {
        let addr = listener.local_addr()?;
        tracing::info!(%addr, "Host listening");

        loop {
            let accepted = tokio::select! {
                _ = self.shutdown.cancelled() => {
                    tracing::info!(%addr, "Host stopped accepting");
                    return Ok(());
                }
                accepted = listener.accept() => accepted,
            };

            match accepted {
                Ok((stream, remote)) => {
                    tracing::debug!(%remote, "Accepted connection");
                    let (reader, writer) = split_tcp(stream);
                    self.spawn_connection(reader, writer);
                }
                Err(e) => tracing::warn!("Accept failed: {e}"),
            }
        }
    }

    /// Serve one already-established connection on a new task.
    pub fn spawn_connection<R, W>(&self, reader: MessageReader<R>, writer: MessageWriter<W>) -> JoinHandle<()>
    where
        R: AsyncRead + Unpin + Send + 'static,
        W: AsyncWrite + Unpin + Send + 'static,
    {
        let host = self.clone();
        tokio::spawn(async move { host.serve_connection(reader, writer).await })
    }

    /// Serve one connection on the current task until it closes.
    pub async fn serve_connection<R, W>(&self, reader: MessageReader<R>, writer: MessageWriter<W>)
    where
        R: AsyncRead + Unpin + Send + 'static,
        W: AsyncWrite + Unpin + Send + 'static,
    {
        let reader = reader.with_max_frame_bytes(self.max_frame_bytes);
        connection::run_connection(self.handler.clone(), reader, writer, self.shutdown.child_token())
            .await;
    }

    /// Push a `$/notification` to one connection.
    ///
    /// Never waits: a connection whose outbound queue is full fails with
    /// [`McpError::Transport`].
    pub async fn notify(&self, connection: ConnectionId, params: NotificationParams) -> McpResult<()> {
        let sender = self
            .handler
            .connections()
            .sender(connection)
            .await
            .ok_or_else(|| McpError::not_found("connection", connection.to_string()))?;

        let msg = Message::notification(Method::Notification, Some(serde_json::to_value(params)?));
        sender.try_send(msg).map_err(|e| match e {
            TrySendError::Full(_) => {
                tracing::warn!(connection = %connection, "Notification dropped; outbound queue full");
                McpError::Transport(format!("connection {connection} is not reading"))
            }
            TrySendError::Closed(_) => McpError::ConnectionClosed,
        })
    }

    /// Push a `$/notification` to every connection. Returns how many
    /// connections accepted it. Connections that are closed or whose
    /// outbound queue is full are skipped.
    pub async fn broadcast(&self, params: NotificationParams) -> McpResult<usize> {
        let msg = Message::notification(Method::Notification, Some(serde_json::to_value(params)?));
        let mut delivered = 0;
        for (id, sender) in self.handler.connections().senders().await {
            match sender.try_send(msg.clone()) {
                Ok(()) => delivered += 1,
                Err(TrySendError::Full(_)) => {
                    tracing::warn!(connection = %id, "Skipping connection; outbound queue full")
                }
                Err(TrySendError::Closed(_)) => {
                    tracing::debug!(connection = %id, "Skipping closed connection")
                }
            }
        }
        Ok(delivered)
    }

    pub async fn connections(&self) -> Vec<ConnectionSummary> {
        self.handler.connections().summaries().await
    }

    /// Stop accepting and close every connection.
    pub fn shutdown(&self) {
        tracing::info!("Host shutdown requested");
        self.shutdown.cancel();
    }

    pub fn is_shutdown(&self) -> bool {
        self.shutdown.is_cancelled()
    }

    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }
}
