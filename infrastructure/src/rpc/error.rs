//! Error types for the tool protocol

use calagent_domain::{ToolError, ToolErrorKind, ValidationError};
use std::time::Duration;
use thiserror::Error;

/// Failure of the framed message channel.
#[derive(Error, Debug)]
pub enum ChannelError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid frame header: {0}")]
    InvalidHeader(String),

    #[error("Frame header has no Content-Length")]
    MissingContentLength,

    #[error("Frame of {size} bytes exceeds the {max} byte limit")]
    FrameTooLarge { size: usize, max: usize },

    #[error("Stream ended inside a frame")]
    UnexpectedEof,

    /// A complete frame whose body is not valid JSON. Framing is intact, so
    /// the channel can keep going.
    #[error("Malformed message: {0}")]
    Malformed(String),

    #[error("Channel closed")]
    Closed,
}

impl ChannelError {
    /// Whether the next frame can still be read after this error.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, ChannelError::Malformed(_))
    }
}

/// Errors raised by the tool client proxy
#[derive(Error, Debug)]
pub enum ClientError {
    #[error("Tool discovery failed: {0}")]
    Discovery(String),

    #[error("Unknown tool: {0}")]
    UnknownTool(String),

    #[error("Invalid arguments: {0}")]
    Validation(#[from] ValidationError),

    #[error("{method} timed out after {after:?}")]
    Timeout { method: String, after: Duration },

    #[error("Channel closed by provider")]
    ChannelClosed,

    #[error("Channel failed: {0}")]
    Channel(String),

    #[error("Provider returned error (code {code}): {message}")]
    Rpc { code: i64, message: String },

    #[error("Unexpected response: {0}")]
    UnexpectedResponse(String),

    #[error("Failed to start provider: {0}")]
    Spawn(std::io::Error),
}

impl From<ChannelError> for ClientError {
    fn from(err: ChannelError) -> Self {
        match err {
            ChannelError::Closed => ClientError::ChannelClosed,
            other => ClientError::Channel(other.to_string()),
        }
    }
}

impl From<ClientError> for ToolError {
    fn from(err: ClientError) -> Self {
        let kind = match &err {
            ClientError::Validation(_) => ToolErrorKind::Validation,
            ClientError::UnknownTool(_) => ToolErrorKind::UnknownTool,
            ClientError::Timeout { .. } => ToolErrorKind::Timeout,
            ClientError::ChannelClosed => ToolErrorKind::ChannelClosed,
            ClientError::Channel(_) | ClientError::Spawn(_) => ToolErrorKind::Channel,
            ClientError::Rpc { code, .. } if *code == super::protocol::error_codes::INVALID_PARAMS => {
                ToolErrorKind::Validation
            }
            ClientError::Discovery(_)
            | ClientError::Rpc { .. }
            | ClientError::UnexpectedResponse(_) => ToolErrorKind::Handler,
        };
        ToolError::new(kind, err.to_string())
    }
}
