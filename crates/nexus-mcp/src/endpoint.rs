//! An optional host and an optional peer bundled for code that wants to
//! both expose and consume tools.

use std::net::SocketAddr;

use serde_json::Value;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

use crate::host::HostSession;
use crate::peer::PeerSession;
use crate::protocol::HandlerOptions;
use crate::types::{ClientCapabilities, McpError, McpResult, Prompt, Resource, Tool};

struct RunningServer {
    host: HostSession,
    addr: SocketAddr,
    task: JoinHandle<McpResult<()>>,
}

/// Holds at most one running host and at most one connected peer.
///
/// Host operations fail with [`McpError::Lifecycle`] while no server is
/// running; peer operations fail the same way while not connected.
pub struct McpEndpoint {
    server: Option<RunningServer>,
    client: Option<PeerSession>,
    options: HandlerOptions,
}

impl Default for McpEndpoint {
    fn default() -> Self {
        Self::new(HandlerOptions::default())
    }
}

impl McpEndpoint {
    pub fn new(options: HandlerOptions) -> Self {
        Self {
            server: None,
            client: None,
            options,
        }
    }

    /// Bind `addr` and start serving in the background. Returns the bound
    /// address, which differs from `addr` when port 0 was requested.
    pub async fn start_server(&mut self, addr: &str) -> McpResult<SocketAddr> {
        if self.server.is_some() {
            return Err(McpError::Lifecycle("server already running".into()));
        }

        let listener = TcpListener::bind(addr).await?;
        let addr = listener.local_addr()?;
        let host = HostSession::new(self.options);
        let serving = host.clone();
        let task = tokio::spawn(async move { serving.serve(listener).await });

        tracing::info!(%addr, "Endpoint server started");
        self.server = Some(RunningServer { host, addr, task });
        Ok(addr)
    }

    pub async fn stop_server(&mut self) -> McpResult<()> {
        let server = self
            .server
            .take()
            .ok_or_else(|| McpError::Lifecycle("server not running".into()))?;

        server.host.shutdown();
        let outcome = server
            .task
            .await
            .map_err(|e| McpError::Internal(format!("server task failed: {e}")))?;
        tracing::info!(addr = %server.addr, "Endpoint server stopped");
        outcome
    }

    pub fn host(&self) -> Option<&HostSession> {
        self.server.as_ref().map(|s| &s.host)
    }

    pub fn server_addr(&self) -> Option<SocketAddr> {
        self.server.as_ref().map(|s| s.addr)
    }

    pub async fn register_tool(&self, tool: Tool) -> McpResult<()> {
        self.running_host()?.register_tool(tool).await
    }

    pub async fn register_resource(&self, resource: Resource) -> McpResult<()> {
        self.running_host()?.register_resource(resource).await
    }

    pub async fn register_prompt(&self, prompt: Prompt) -> McpResult<()> {
        self.running_host()?.register_prompt(prompt).await
    }

    /// Dial a host, declaring every client capability. The handshake is
    /// left to the caller through [`McpEndpoint::peer`].
    pub async fn connect(&mut self, addr: &str) -> McpResult<()> {
        if self.client.is_some() {
            return Err(McpError::Lifecycle("already connected".into()));
        }
        self.client = Some(PeerSession::connect(addr, ClientCapabilities::all()).await?);
        Ok(())
    }

    pub async fn disconnect(&mut self) -> McpResult<()> {
        let client = self
            .client
            .take()
            .ok_or_else(|| McpError::Lifecycle("not connected".into()))?;
        client.close().await;
        Ok(())
    }

    pub fn peer(&self) -> Option<&PeerSession> {
        self.client.as_ref()
    }

    pub async fn call_tool(&self, name: &str, arguments: Value) -> McpResult<Value> {
        self.connected_peer()?.call_tool(name, arguments).await
    }

    pub async fn list_tools(&self) -> McpResult<Vec<Tool>> {
        self.connected_peer()?.list_tools().await
    }

    fn running_host(&self) -> McpResult<&HostSession> {
        self.host()
            .ok_or_else(|| McpError::Lifecycle("server not running".into()))
    }

    fn connected_peer(&self) -> McpResult<&PeerSession> {
        self.client
            .as_ref()
            .ok_or_else(|| McpError::Lifecycle("not connected".into()))
    }
}

impl Drop for McpEndpoint {
    fn drop(&mut self) {
        if let Some(server) = &self.server {
            server.host.shutdown();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn host_operations_need_running_server() {
        let endpoint = McpEndpoint::default();
        let err = endpoint
            .register_tool(Tool::new("echo", "", json!({})))
            .await
            .unwrap_err();
        assert!(matches!(err, McpError::Lifecycle(_)));
    }

    #[tokio::test]
    async fn peer_operations_need_connection() {
        let mut endpoint = McpEndpoint::default();
        assert!(matches!(endpoint.list_tools().await, Err(McpError::Lifecycle(_))));
        assert!(matches!(endpoint.disconnect().await, Err(McpError::Lifecycle(_))));
    }

    #[tokio::test]
    async fn double_start_is_rejected() {
        let mut endpoint = McpEndpoint::default();
        endpoint.start_server("127.0.0.1:0").await.unwrap();
        assert!(matches!(
            endpoint.start_server("127.0.0.1:0").await,
            Err(McpError::Lifecycle(_))
        ));
        endpoint.stop_server().await.unwrap();
        assert!(matches!(endpoint.stop_server().await, Err(McpError::Lifecycle(_))));
    }
}
