//! Newline-delimited JSON framing over any byte stream.
//!
//! Each message is one JSON object terminated by `\n`. The reader and
//! writer halves are separate so one task can read while others write.

use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;

use crate::types::{McpError, McpResult, Message};

/// Default upper bound on a single frame.
pub const DEFAULT_MAX_FRAME_BYTES: usize = 1024 * 1024;

/// Reading half of a framed connection.
pub struct MessageReader<R> {
    reader: BufReader<R>,
    max_frame_bytes: usize,
}

impl<R> MessageReader<R>
where
    R: AsyncRead + Unpin,
{
    pub fn new(reader: R) -> Self {
        Self {
            reader: BufReader::new(reader),
            max_frame_bytes: DEFAULT_MAX_FRAME_BYTES,
        }
    }

    pub fn with_max_frame_bytes(mut self, max: usize) -> Self {
        self.max_frame_bytes = max;
        self
    }

    /// Read the next message. Returns `None` on EOF; blank lines are skipped.
    ///
    /// A frame that is too long or not a valid message is an error, and the
    /// caller is expected to drop the connection.
    pub async fn recv(&mut self) -> McpResult<Option<Message>> {
        let limit = self.max_frame_bytes as u64 + 1;
        let mut line = String::new();
        loop {
            line.clear();
            let read = (&mut self.reader)
                .take(limit)
                .read_line(&mut line)
                .await
                .map_err(|e| McpError::Transport(format!("read failed: {e}")))?;

            if read == 0 {
                return Ok(None);
            }
            if read as u64 >= limit && !line.ends_with('\n') {
                return Err(McpError::Transport(format!(
                    "frame exceeds {} bytes",
                    self.max_frame_bytes
                )));
            }

            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }

            tracing::trace!(len = trimmed.len(), "read frame");
            return serde_json::from_str(trimmed)
                .map(Some)
                .map_err(|e| McpError::Parse(e.to_string()));
        }
    }
}

/// Writing half of a framed connection.
pub struct MessageWriter<W> {
    writer: W,
}

impl<W> MessageWriter<W>
where
    W: AsyncWrite + Unpin,
{
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    /// Serialize and write one message, then flush.
    pub async fn send(&mut self, message: &Message) -> McpResult<()> {
        let mut frame = serde_json::to_vec(message)?;
        frame.push(b'\n');
        tracing::trace!(len = frame.len(), "writing frame");

        self.writer
            .write_all(&frame)
            .await
            .map_err(|e| McpError::Transport(format!("write failed: {e}")))?;
        self.writer
            .flush()
            .await
            .map_err(|e| McpError::Transport(format!("flush failed: {e}")))?;
        Ok(())
    }

    /// Shut the write side down.
    pub async fn shutdown(&mut self) -> McpResult<()> {
        self.writer
            .shutdown()
            .await
            .map_err(|e| McpError::Transport(format!("shutdown failed: {e}")))
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

/// Split a TCP stream into framed halves.
pub fn split_tcp(stream: TcpStream) -> (MessageReader<OwnedReadHalf>, MessageWriter<OwnedWriteHalf>) {
    let (read, write) = stream.into_split();
    (MessageReader::new(read), MessageWriter::new(write))
}
