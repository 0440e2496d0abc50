//! Bidirectional JSON message channel over a pair of byte streams.
//!
//! A [`Channel`] is split once into a [`ChannelReader`], owned by a single
//! reader task, and a [`ChannelWriter`], shared behind an `Arc` by every
//! task that needs to send. Writes are serialized by a mutex so frames are
//! never interleaved.

use super::error::ChannelError;
use super::framing::{FrameReader, FrameWriter};
use serde_json::Value;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::Mutex;
use tracing::trace;

type BoxReader = Box<dyn AsyncRead + Send + Unpin>;
type BoxWriter = Box<dyn AsyncWrite + Send + Unpin>;

pub struct Channel {
    reader: ChannelReader,
    writer: ChannelWriter,
}

impl Channel {
    pub fn new<R, W>(reader: R, writer: W, max_frame_bytes: usize) -> Self
    where
        R: AsyncRead + Send + Unpin + 'static,
        W: AsyncWrite + Send + Unpin + 'static,
    {
        Self {
            reader: ChannelReader {
                frames: FrameReader::new(Box::new(reader), max_frame_bytes),
            },
            writer: ChannelWriter {
                frames: Mutex::new(Some(FrameWriter::new(Box::new(writer), max_frame_bytes))),
            },
        }
    }

    /// Channel over this process's stdin/stdout.
    pub fn stdio(max_frame_bytes: usize) -> Self {
        Self::new(tokio::io::stdin(), tokio::io::stdout(), max_frame_bytes)
    }

    /// Two connected in-process channels.
    pub fn pair(max_frame_bytes: usize) -> (Self, Self) {
        let (a, b) = tokio::io::duplex(64 * 1024);
        let (a_read, a_write) = tokio::io::split(a);
        let (b_read, b_write) = tokio::io::split(b);
        (
            Self::new(a_read, a_write, max_frame_bytes),
            Self::new(b_read, b_write, max_frame_bytes),
        )
    }

    pub fn split(self) -> (ChannelReader, ChannelWriter) {
        (self.reader, self.writer)
    }
}

pub struct ChannelReader {
    frames: FrameReader<BoxReader>,
}

impl ChannelReader {
    /// Receive the next message.
    ///
    /// `Ok(None)` means the peer closed the stream cleanly. A frame whose
    /// body is not JSON yields [`ChannelError::Malformed`] and leaves the
    /// reader positioned at the next frame.
    pub async fn receive(&mut self) -> Result<Option<Value>, ChannelError> {
        let Some(body) = self.frames.read_frame().await? else {
            return Ok(None);
        };
        trace!(bytes = body.len(), "Received frame");
        serde_json::from_slice(&body)
            .map(Some)
            .map_err(|e| ChannelError::Malformed(e.to_string()))
    }
}

pub struct ChannelWriter {
    frames: Mutex<Option<FrameWriter<BoxWriter>>>,
}

impl ChannelWriter {
    pub async fn send(&self, message: &Value) -> Result<(), ChannelError> {
        let body = serde_json::to_vec(message)
            .map_err(|e| ChannelError::Malformed(e.to_string()))?;
        let mut guard = self.frames.lock().await;
        let writer = guard.as_mut().ok_or(ChannelError::Closed)?;
        trace!(bytes = body.len(), "Sending frame");
        writer.write_frame(&body).await
    }

    /// Close the write side. Calling this more than once is a no-op.
    pub async fn close(&self) {
        if let Some(mut writer) = self.frames.lock().await.take() {
            let _ = writer.shutdown().await;
        }
    }

    pub async fn is_closed(&self) -> bool {
        self.frames.lock().await.is_none()
    }
}
