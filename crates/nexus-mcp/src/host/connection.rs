//! Per-connection read loop and writer task.

use std::sync::Arc;

use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::protocol::negotiation::ConnectionId;
use crate::protocol::ProtocolHandler;
use crate::transport::{MessageReader, MessageWriter};
use crate::types::Message;

/// Capacity of each connection's outbound queue.
const OUTBOUND_QUEUE: usize = 64;

/// Drive one connection until EOF, a transport failure, or shutdown.
///
/// Messages are decoded, handled, and answered strictly in arrival order;
/// a slow handler delays later messages on this connection only. The
/// connection's state is removed from the table before returning.
pub(crate) async fn run_connection<R, W>(
    handler: Arc<ProtocolHandler>,
    mut reader: MessageReader<R>,
    writer: MessageWriter<W>,
    shutdown: CancellationToken,
) where
    R: AsyncRead + Unpin + Send + 'static,
    W: AsyncWrite + Unpin + Send + 'static,
{
    let (tx, rx) = mpsc::channel::<Message>(OUTBOUND_QUEUE);
    let id = handler.connections().open(Some(tx.clone())).await;
    tracing::info!(connection = %id, "Connection opened");

    let writer_task = tokio::spawn(write_loop(id, writer, rx));

    loop {
        let next = tokio::select! {
            _ = shutdown.cancelled() => {
                tracing::debug!(connection = %id, "Shutdown requested");
                break;
            }
            _ = tx.closed() => {
                tracing::debug!(connection = %id, "Writer stopped");
                break;
            }
            next = reader.recv() => next,
        };

        let msg = match next {
            Ok(Some(msg)) => msg,
            Ok(None) => {
                tracing::info!(connection = %id, "Peer closed the connection");
                break;
            }
            Err(e) => {
                tracing::error!(connection = %id, "Read failed: {e}");
                break;
            }
        };

        if let Some(response) = handler.handle_message(id, msg).await {
            if tx.send(response).await.is_err() {
                tracing::error!(connection = %id, "Dropping response; writer is gone");
                break;
            }
        }
    }

    handler.connections().close(id).await;
    drop(tx);
    if let Err(e) = writer_task.await {
        tracing::error!(connection = %id, "Writer task failed: {e}");
    }
    tracing::info!(connection = %id, "Connection closed");
}

async fn write_loop<W>(id: ConnectionId, mut writer: MessageWriter<W>, mut rx: mpsc::Receiver<Message>)
where
    W: AsyncWrite + Unpin,
{
    while let Some(msg) = rx.recv().await {
        if let Err(e) = writer.send(&msg).await {
            tracing::error!(connection = %id, "Write failed: {e}");
            return;
        }
    }
    if let Err(e) = writer.shutdown().await {
        tracing::debug!(connection = %id, "Shutdown after close failed: {e}");
    }
}
