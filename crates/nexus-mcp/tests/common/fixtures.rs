//! Shared fixtures: in-memory host/peer wiring and sample registry entries.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};
use tokio::io::{duplex, split, DuplexStream, ReadHalf, WriteHalf};

use nexus_mcp::transport::{MessageReader, MessageWriter};
use nexus_mcp::types::{ClientCapabilities, McpError, McpResult, Prompt, Resource, Tool};
use nexus_mcp::{HostSession, PeerSession, RequestContext, ToolHandler};

pub type RawReader = MessageReader<ReadHalf<DuplexStream>>;
pub type RawWriter = MessageWriter<WriteHalf<DuplexStream>>;

const PIPE_CAPACITY: usize = 64 * 1024;

/// Attach a new in-memory connection to `host` and return the client end
/// as raw framed halves.
pub fn raw_connection(host: &HostSession) -> (RawReader, RawWriter) {
    let (client, server) = duplex(PIPE_CAPACITY);
    let (server_read, server_write) = split(server);
    host.spawn_connection(
        MessageReader::new(server_read),
        MessageWriter::new(server_write),
    );
    let (client_read, client_write) = split(client);
    (MessageReader::new(client_read), MessageWriter::new(client_write))
}

/// Attach a new in-memory connection to `host` and wrap it in a peer.
pub fn connect_peer(host: &HostSession) -> PeerSession {
    let (reader, writer) = raw_connection(host);
    PeerSession::from_parts(reader, writer, ClientCapabilities::all())
}

pub fn echo_tool() -> Tool {
    Tool::new(
        "echo",
        "Echo the text argument",
        json!({
            "type": "object",
            "properties": {"text": {"type": "string"}},
            "required": ["text"]
        }),
    )
}

pub fn slow_tool() -> Tool {
    Tool::new("slow", "Sleeps before answering", json!({"type": "object"}))
}

pub fn notes_resource() -> Resource {
    Resource::new("file:///notes.md", "file", "notes", "Project notes")
}

pub fn greet_prompt() -> Prompt {
    Prompt::new("greet", "Greeting", "Hello {{name}}")
}

/// Returns its `text` argument.
pub struct Echo;

#[async_trait]
impl ToolHandler for Echo {
    async fn call(&self, _ctx: RequestContext, arguments: Value) -> McpResult<Value> {
        Ok(json!({"echo": arguments["text"]}))
    }
}

/// Sleeps for the given duration, then answers.
pub struct Sleep(pub Duration);

#[async_trait]
impl ToolHandler for Sleep {
    async fn call(&self, _ctx: RequestContext, _arguments: Value) -> McpResult<Value> {
        tokio::time::sleep(self.0).await;
        Ok(json!({"slept_ms": self.0.as_millis() as u64}))
    }
}

/// Always fails.
pub struct Broken;

#[async_trait]
impl ToolHandler for Broken {
    async fn call(&self, _ctx: RequestContext, _arguments: Value) -> McpResult<Value> {
        Err(McpError::ToolExecution {
            tool: "broken".into(),
            message: "disk on fire".into(),
        })
    }
}

/// A host with the sample tool, resource, and prompt registered and the
/// echo and slow handlers bound.
pub async fn sample_host() -> HostSession {
    let host = HostSession::default();
    host.register_tool(echo_tool()).await.unwrap();
    host.register_tool(slow_tool()).await.unwrap();
    host.register_resource(notes_resource()).await.unwrap();
    host.register_prompt(greet_prompt()).await.unwrap();
    host.bind_tool_handler("echo", std::sync::Arc::new(Echo))
        .await
        .unwrap();
    host.bind_tool_handler("slow", std::sync::Arc::new(Sleep(Duration::from_secs(5))))
        .await
        .unwrap();
    host
}
