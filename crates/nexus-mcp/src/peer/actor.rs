//! The task that owns a peer connection's writer and pending-request table.
//!
//! Callers talk to it only through [`Command`]s, so the table needs no lock.
//! A separate reader task feeds decoded inbound messages into the same
//! queue, which keeps every table mutation on one task.

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::Value;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

use crate::transport::{MessageReader, MessageWriter};
use crate::types::{McpError, McpResult, Message, Method, NotificationParams, RequestId};

use super::NotificationHandler;

type Reply = oneshot::Sender<McpResult<Message>>;

pub(crate) enum Command {
    /// Write a request and remember who is waiting for its response.
    Request {
        id: i64,
        message: Message,
        reply: Reply,
    },
    /// Write a message that expects no response.
    Notify {
        message: Message,
        done: oneshot::Sender<McpResult<()>>,
    },
    /// The caller stopped waiting for `id`.
    Forget { id: i64 },
    SetHandler(Arc<dyn NotificationHandler>),
    Inbound(Message),
    ReaderClosed(String),
    Close { done: Option<oneshot::Sender<()>> },
}

pub(crate) struct PeerActor<W> {
    writer: MessageWriter<W>,
    pending: HashMap<i64, Reply>,
    handler: Option<Arc<dyn NotificationHandler>>,
    commands: mpsc::UnboundedReceiver<Command>,
    reader: JoinHandle<()>,
}

/// Start the reader and actor tasks for one connection.
pub(crate) fn spawn<R, W>(reader: MessageReader<R>, writer: MessageWriter<W>) -> mpsc::UnboundedSender<Command>
where
    R: AsyncRead + Unpin + Send + 'static,
    W: AsyncWrite + Unpin + Send + 'static,
{
    let (tx, rx) = mpsc::unbounded_channel();
    let reader = tokio::spawn(read_loop(reader, tx.clone()));
    let actor = PeerActor {
        writer,
        pending: HashMap::new(),
        handler: None,
        commands: rx,
        reader,
    };
    tokio::spawn(actor.run());
    tx
}

impl<W> PeerActor<W>
where
    W: AsyncWrite + Unpin + Send + 'static,
{
    async fn run(mut self) {
        while let Some(command) = self.commands.recv().await {
            match command {
                Command::Request { id, message, reply } => {
                    if let Err(e) = self.writer.send(&message).await {
                        tracing::error!(id, "Request write failed: {e}");
                        let _ = reply.send(Err(e));
                        continue;
                    }
                    self.pending.insert(id, reply);
                }
                Command::Notify { message, done } => {
                    let _ = done.send(self.writer.send(&message).await);
                }
                Command::Forget { id } => {
                    if self.pending.remove(&id).is_some() {
                        tracing::debug!(id, "Caller gave up on request");
                    }
                }
                Command::SetHandler(handler) => self.handler = Some(handler),
                Command::Inbound(message) => self.route(message),
                Command::ReaderClosed(reason) => {
                    tracing::warn!("Connection to host lost: {reason}");
                    break;
                }
                Command::Close { done } => {
                    self.finish().await;
                    if let Some(done) = done {
                        let _ = done.send(());
                    }
                    return;
                }
            }
        }
        self.finish().await;
    }

    /// Stop reading, fail every waiter, and shut the write side.
    async fn finish(&mut self) {
        self.reader.abort();
        self.commands.close();

        if !self.pending.is_empty() {
            tracing::debug!(count = self.pending.len(), "Failing pending requests");
        }
        for (_, reply) in self.pending.drain() {
            let _ = reply.send(Err(McpError::ConnectionClosed));
        }
        // Requests queued behind the close never reached the wire.
        while let Ok(command) = self.commands.try_recv() {
            if let Command::Request { reply, .. } = command {
                let _ = reply.send(Err(McpError::ConnectionClosed));
            }
        }

        if let Err(e) = self.writer.shutdown().await {
            tracing::debug!("Shutdown after close failed: {e}");
        }
        tracing::info!("Peer connection closed");
    }

    fn route(&mut self, message: Message) {
        if message.is_response() {
            let id = match &message.id {
                Some(RequestId::Number(id)) => *id,
                other => {
                    tracing::warn!(id = ?other, "Discarding response with foreign id");
                    return;
                }
            };
            match self.pending.remove(&id) {
                Some(reply) => {
                    let _ = reply.send(Ok(message));
                }
                None => tracing::debug!(id, "Discarding response with no waiter"),
            }
            return;
        }

        match message.method.as_deref() {
            Some(method) if method == Method::Notification.as_str() => {
                self.dispatch_notification(message.params)
            }
            Some(method) if message.id.is_none() => {
                tracing::debug!(method, "Ignoring notification")
            }
            Some(method) => tracing::warn!(
                method,
                id = ?message.id,
                "Discarding inbound request; peers do not serve requests"
            ),
            None => tracing::warn!("Discarding message with neither method nor id"),
        }
    }

    fn dispatch_notification(&self, params: Option<Value>) {
        let params = params.unwrap_or_else(|| Value::Object(Default::default()));
        let params: NotificationParams = match serde_json::from_value(params) {
            Ok(params) => params,
            Err(e) => {
                tracing::warn!("Discarding malformed notification: {e}");
                return;
            }
        };

        let Some(handler) = self.handler.clone() else {
            tracing::debug!(kind = %params.kind, "No notification handler installed");
            return;
        };
        tokio::spawn(async move { handler.on_notification(params).await });
    }
}

async fn read_loop<R>(mut reader: MessageReader<R>, commands: mpsc::UnboundedSender<Command>)
where
    R: AsyncRead + Unpin,
{
    let reason = loop {
        match reader.recv().await {
            Ok(Some(message)) => {
                tracing::debug!(id = ?message.id, method = ?message.method, "Received");
                if commands.send(Command::Inbound(message)).is_err() {
                    return;
                }
            }
            Ok(None) => break "host closed the connection".to_string(),
            Err(e) => break e.to_string(),
        }
    };
    let _ = commands.send(Command::ReaderClosed(reason));
}
