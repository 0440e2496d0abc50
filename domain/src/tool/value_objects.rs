//! Tool domain value objects: call outcomes and tool-level errors
//!
//! A [`ToolOutcome`] is what the reasoning capability sees for every call.
//! Failures carry a [`ToolErrorKind`] so the agent loop can tell recoverable
//! failures (fed back as data) from session-fatal ones.

use super::traits::ValidationError;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Category of a tool-level failure.
///
/// | Kind | Source | Session-fatal |
/// |------|--------|:---:|
/// | `validation` | arguments do not match the input schema | no |
/// | `unknown_tool` | no tool with that name | no |
/// | `handler` | handler failed or returned a bad value | no |
/// | `backend` | calendar service rejected the request | no |
/// | `not_found` | referenced event does not exist | no |
/// | `timeout` | no result within the call deadline | no |
/// | `channel` | transport corrupted | yes |
/// | `channel_closed` | provider went away | yes |
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolErrorKind {
    Validation,
    UnknownTool,
    Handler,
    Backend,
    NotFound,
    Timeout,
    Channel,
    ChannelClosed,
}

impl ToolErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ToolErrorKind::Validation => "validation",
            ToolErrorKind::UnknownTool => "unknown_tool",
            ToolErrorKind::Handler => "handler",
            ToolErrorKind::Backend => "backend",
            ToolErrorKind::NotFound => "not_found",
            ToolErrorKind::Timeout => "timeout",
            ToolErrorKind::Channel => "channel",
            ToolErrorKind::ChannelClosed => "channel_closed",
        }
    }

    /// Whether the session cannot continue after this failure.
    pub fn is_session_fatal(&self) -> bool {
        matches!(self, ToolErrorKind::Channel | ToolErrorKind::ChannelClosed)
    }
}

impl std::fmt::Display for ToolErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error that occurred during tool execution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolError {
    pub kind: ToolErrorKind,
    /// Human-readable error message
    pub message: String,
}

impl ToolError {
    pub fn new(kind: ToolErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn unknown_tool(name: impl AsRef<str>) -> Self {
        Self::new(
            ToolErrorKind::UnknownTool,
            format!("Unknown tool: {}", name.as_ref()),
        )
    }

    pub fn handler(message: impl Into<String>) -> Self {
        Self::new(ToolErrorKind::Handler, message)
    }

    pub fn backend(message: impl Into<String>) -> Self {
        Self::new(ToolErrorKind::Backend, message)
    }

    pub fn not_found(resource: impl AsRef<str>) -> Self {
        Self::new(
            ToolErrorKind::NotFound,
            format!("Resource not found: {}", resource.as_ref()),
        )
    }

    pub fn timeout(operation: impl AsRef<str>) -> Self {
        Self::new(
            ToolErrorKind::Timeout,
            format!("Operation timed out: {}", operation.as_ref()),
        )
    }

    pub fn channel(message: impl Into<String>) -> Self {
        Self::new(ToolErrorKind::Channel, message)
    }

    pub fn channel_closed() -> Self {
        Self::new(ToolErrorKind::ChannelClosed, "Channel closed by provider")
    }

    pub fn is_session_fatal(&self) -> bool {
        self.kind.is_session_fatal()
    }
}

impl From<ValidationError> for ToolError {
    fn from(err: ValidationError) -> Self {
        Self::new(ToolErrorKind::Validation, err.to_string())
    }
}

impl std::fmt::Display for ToolError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}", self.kind, self.message)
    }
}

impl std::error::Error for ToolError {}

/// Result of one tool call as seen by the agent.
///
/// Serialized flat so it can travel as a `tools/call` result:
/// `{"outcome":"success","value":..}` or
/// `{"outcome":"failure","kind":..,"message":..}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ToolOutcome {
    Success { value: Value },
    Failure(ToolError),
}

impl ToolOutcome {
    pub fn success(value: Value) -> Self {
        ToolOutcome::Success { value }
    }

    pub fn failure(error: ToolError) -> Self {
        ToolOutcome::Failure(error)
    }

    pub fn is_success(&self) -> bool {
        matches!(self, ToolOutcome::Success { .. })
    }

    pub fn error(&self) -> Option<&ToolError> {
        match self {
            ToolOutcome::Failure(err) => Some(err),
            ToolOutcome::Success { .. } => None,
        }
    }

    /// Text form handed back to the reasoning capability.
    pub fn to_content(&self) -> String {
        match self {
            ToolOutcome::Success { value } => value.to_string(),
            ToolOutcome::Failure(err) => format!("Error: {}", err),
        }
    }
}

impl From<Result<Value, ToolError>> for ToolOutcome {
    fn from(result: Result<Value, ToolError>) -> Self {
        match result {
            Ok(value) => ToolOutcome::success(value),
            Err(err) => ToolOutcome::failure(err),
        }
    }
}
