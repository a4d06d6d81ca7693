//! Tool handlers and the executor that runs them for `tools/call`.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::RwLock;
use tokio::time::Instant;

use crate::protocol::negotiation::ConnectionId;
use crate::protocol::validator::ArgumentSchema;
use crate::types::{McpError, McpResult, StatusResult, Tool};

/// Per-call context handed to a [`ToolHandler`].
#[derive(Debug, Clone)]
pub struct RequestContext {
    /// Connection the call arrived on.
    pub connection: ConnectionId,
    /// Root context the peer declared during `initialize`.
    pub root_uri: String,
    /// Time budget granted to this call.
    pub timeout: Duration,
    /// Point in time after which the call is abandoned.
    pub deadline: Instant,
}

impl RequestContext {
    pub fn new(connection: ConnectionId, root_uri: impl Into<String>, timeout: Duration) -> Self {
        Self {
            connection,
            root_uri: root_uri.into(),
            timeout,
            deadline: Instant::now() + timeout,
        }
    }

    /// Narrow the budget; never extends it.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        if timeout < self.timeout {
            self.timeout = timeout;
            self.deadline = Instant::now() + timeout;
        }
        self
    }

    /// Time left before the deadline.
    pub fn remaining(&self) -> Duration {
        self.deadline.saturating_duration_since(Instant::now())
    }
}

/// Executable behaviour behind a registered tool.
///
/// Handlers run outside the registry lock. A handler is abandoned at the
/// next await point once its deadline passes; a handler that blocks the
/// thread without yielding still stalls its connection.
#[async_trait]
pub trait ToolHandler: Send + Sync {
    async fn call(&self, ctx: RequestContext, arguments: Value) -> McpResult<Value>;
}

/// A handler and the compiled schema of the tool it serves.
#[derive(Clone)]
struct Binding {
    handler: Arc<dyn ToolHandler>,
    schema: Arc<ArgumentSchema>,
}

/// Tool name → handler bindings.
#[derive(Default)]
pub struct ToolExecutor {
    handlers: RwLock<HashMap<String, Binding>>,
}

impl ToolExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind a handler to `tool`, returning any handler it replaces.
    ///
    /// The tool's parameter schema is compiled here; an invalid schema
    /// fails the bind.
    pub async fn bind(
        &self,
        tool: &Tool,
        handler: Arc<dyn ToolHandler>,
    ) -> McpResult<Option<Arc<dyn ToolHandler>>> {
        let binding = Binding {
            handler,
            schema: Arc::new(ArgumentSchema::compile(tool)?),
        };
        let replaced = self.handlers.write().await.insert(tool.name.clone(), binding);
        Ok(replaced.map(|b| b.handler))
    }

    pub async fn unbind(&self, name: &str) -> Option<Arc<dyn ToolHandler>> {
        self.handlers.write().await.remove(name).map(|b| b.handler)
    }

    pub async fn is_bound(&self, name: &str) -> bool {
        self.handlers.read().await.contains_key(name)
    }

    /// Run `tool` with `arguments`.
    ///
    /// Tools without a bound handler answer with the plain success
    /// acknowledgement. Bound tools have their arguments checked against
    /// the tool's parameter schema first.
    pub async fn execute(
        &self,
        tool: &Tool,
        ctx: RequestContext,
        arguments: Value,
    ) -> McpResult<Value> {
        let binding = self.handlers.read().await.get(&tool.name).cloned();
        let Some(Binding { handler, schema }) = binding else {
            return Ok(serde_json::to_value(StatusResult::success())?);
        };

        schema.validate(&arguments)?;

        let deadline = ctx.deadline;
        let budget = ctx.timeout;
        match tokio::time::timeout_at(deadline, handler.call(ctx, arguments)).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(e @ McpError::ToolExecution { .. })) => Err(e),
            Ok(Err(e)) => Err(McpError::ToolExecution {
                tool: tool.name.clone(),
                message: e.to_string(),
            }),
            Err(_) => Err(McpError::Timeout(budget)),
        }
    }
}

impl std::fmt::Debug for ToolExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolExecutor").finish_non_exhaustive()
    }
}
