//! Nexus MCP engine: a bidirectional message protocol that lets a host
//! expose tools, resources, and prompt templates to connected peers.
//!
//! A [`HostSession`] accepts connections and answers requests from its
//! registries. A [`PeerSession`] dials a host, runs the handshake, and
//! issues correlated requests. [`McpEndpoint`] bundles one of each.

pub mod config;
pub mod endpoint;
pub mod host;
pub mod peer;
pub mod prompts;
pub mod protocol;
pub mod registry;
pub mod tools;
pub mod transport;
pub mod types;

pub use config::ServerConfig;
pub use endpoint::McpEndpoint;
pub use host::HostSession;
pub use peer::{NotificationHandler, PeerSession};
pub use protocol::ProtocolHandler;
pub use tools::{RequestContext, ToolHandler};
