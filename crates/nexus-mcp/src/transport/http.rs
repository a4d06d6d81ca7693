//! HTTP binding: one JSON message per POST, sessions keyed by header.

use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::State,
    http::{HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use tokio_util::sync::CancellationToken;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::protocol::{ConnectionId, ProtocolHandler};
use crate::types::{McpError, McpResult, Message};

/// Header carrying the session a request belongs to.
pub const SESSION_HEADER: &str = "mcp-session-id";

/// Sessions with no request for this long are dropped.
pub const DEFAULT_SESSION_IDLE: Duration = Duration::from_secs(600);

/// HTTP transport for clients that cannot hold a socket open.
///
/// The first POST without a session header opens a connection and the
/// response carries its id. Later requests send it back. HTTP sessions
/// have no push channel, so host notifications are not delivered to them.
/// Sessions that go quiet for longer than the idle timeout are dropped, as
/// are sessions ended with `DELETE /mcp`.
pub struct HttpTransport {
    handler: Arc<ProtocolHandler>,
    idle_timeout: Duration,
}

impl HttpTransport {
    pub fn new(handler: Arc<ProtocolHandler>) -> Self {
        Self {
            handler,
            idle_timeout: DEFAULT_SESSION_IDLE,
        }
    }

    pub fn with_idle_timeout(mut self, idle_timeout: Duration) -> Self {
        self.idle_timeout = idle_timeout;
        self
    }

    /// Drop sessions idle for longer than the idle timeout. Returns how
    /// many were dropped.
    pub async fn reap_idle(&self) -> usize {
        let reaped = self.handler.connections().reap_idle(self.idle_timeout).await;
        for id in &reaped {
            tracing::info!(session = %id, "HTTP session expired");
        }
        reaped.len()
    }

    pub fn router(&self) -> Router {
        Router::new()
            .route("/mcp", post(handle_post).delete(handle_delete))
            .route("/health", get(|| async { "ok" }))
            .layer(
                ServiceBuilder::new()
                    .layer(TraceLayer::new_for_http())
                    .layer(CorsLayer::permissive()),
            )
            .with_state(self.handler.clone())
    }

    /// Serve on `addr` until `shutdown` fires.
    pub async fn run(&self, addr: &str, shutdown: CancellationToken) -> McpResult<()> {
        let listener = tokio::net::TcpListener::bind(addr).await?;
        tracing::info!("HTTP transport listening on {addr}");

        let sweeper = HttpTransport {
            handler: self.handler.clone(),
            idle_timeout: self.idle_timeout,
        };
        let stop = shutdown.clone();
        tokio::spawn(async move {
            let period = (sweeper.idle_timeout / 2).max(Duration::from_secs(1));
            let mut ticks = tokio::time::interval(period);
            loop {
                tokio::select! {
                    _ = stop.cancelled() => return,
                    _ = ticks.tick() => {
                        sweeper.reap_idle().await;
                    }
                }
            }
        });

        axum::serve(listener, self.router())
            .with_graceful_shutdown(async move { shutdown.cancelled().await })
            .await
            .map_err(|e| McpError::Transport(e.to_string()))
    }
}

fn session_from(headers: &HeaderMap) -> Result<Option<ConnectionId>, StatusCode> {
    let Some(value) = headers.get(SESSION_HEADER) else {
        return Ok(None);
    };
    value
        .to_str()
        .ok()
        .and_then(|s| s.parse().ok())
        .map(Some)
        .ok_or(StatusCode::BAD_REQUEST)
}

async fn handle_post(
    State(handler): State<Arc<ProtocolHandler>>,
    headers: HeaderMap,
    Json(msg): Json<Message>,
) -> Response {
    let session = match session_from(&headers) {
        Ok(Some(id)) if handler.connections().touch(id).await => id,
        Ok(Some(id)) => {
            tracing::debug!(session = %id, "Unknown session");
            return StatusCode::NOT_FOUND.into_response();
        }
        Ok(None) => {
            let id = handler.connections().open(None).await;
            tracing::info!(session = %id, "HTTP session opened");
            id
        }
        Err(status) => return status.into_response(),
    };

    let mut response = match handler.handle_message(session, msg).await {
        Some(reply) => Json(reply).into_response(),
        None => StatusCode::NO_CONTENT.into_response(),
    };
    if let Ok(value) = HeaderValue::from_str(&session.to_string()) {
        response.headers_mut().insert(SESSION_HEADER, value);
    }
    response
}

async fn handle_delete(State(handler): State<Arc<ProtocolHandler>>, headers: HeaderMap) -> StatusCode {
    match session_from(&headers) {
        Ok(Some(id)) if handler.connections().close(id).await => {
            tracing::info!(session = %id, "HTTP session closed");
            StatusCode::NO_CONTENT
        }
        Ok(_) => StatusCode::NOT_FOUND,
        Err(status) => status,
    }
}
