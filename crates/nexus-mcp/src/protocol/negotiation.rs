//! Per-connection handshake state.

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::types::{ClientCapabilities, InitializeParams, InitializeResult, McpError, McpResult};

/// Identity of one accepted connection.
pub type ConnectionId = Uuid;

/// Where a connection is in the handshake.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionPhase {
    /// Accepted, nothing negotiated yet.
    Connected,
    /// `initialize` answered, waiting for `initialized`.
    CapabilitiesNegotiated,
    /// Handshake complete.
    Ready,
}

/// Negotiated state of one connection.
#[derive(Debug, Clone)]
pub struct ConnectionState {
    /// The peer's declared capabilities.
    pub client: ClientCapabilities,
    /// Opaque root context from `initialize`.
    pub root_uri: String,
    /// Whether the `initialized` notification arrived.
    pub initialized: bool,
    /// Current handshake phase.
    pub phase: ConnectionPhase,
    /// When the connection was accepted.
    pub connected_at: DateTime<Utc>,
}

impl Default for ConnectionState {
    fn default() -> Self {
        Self {
            client: ClientCapabilities::default(),
            root_uri: String::new(),
            initialized: false,
            phase: ConnectionPhase::Connected,
            connected_at: Utc::now(),
        }
    }
}

impl ConnectionState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Process an initialize request and return the result.
    ///
    /// Capabilities are fixed once negotiated, so a second `initialize`
    /// on the same connection is rejected.
    pub fn negotiate(&mut self, params: InitializeParams) -> McpResult<InitializeResult> {
        if self.phase != ConnectionPhase::Connected {
            return Err(McpError::InvalidRequest(
                "connection already initialized; re-negotiation is not supported".to_string(),
            ));
        }

        self.client = params.capabilities;
        self.root_uri = params.root_uri;
        self.phase = ConnectionPhase::CapabilitiesNegotiated;

        tracing::info!(root_uri = %self.root_uri, "Capabilities negotiated");

        Ok(InitializeResult::default_result())
    }

    /// Mark the handshake as complete (after receiving `initialized` notification).
    pub fn mark_initialized(&mut self) {
        if self.phase == ConnectionPhase::Connected {
            tracing::warn!("Received 'initialized' before 'initialize'; using default capabilities");
        }
        self.initialized = true;
        self.phase = ConnectionPhase::Ready;
        tracing::info!("MCP handshake complete");
    }

    /// Check that the handshake is complete before processing requests.
    pub fn ensure_initialized(&self) -> McpResult<()> {
        if !self.initialized {
            return Err(McpError::InvalidRequest(
                "connection not yet initialized. Send 'initialize' and 'initialized' first."
                    .to_string(),
            ));
        }
        Ok(())
    }
}
