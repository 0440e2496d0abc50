//! Type definitions for the RunAgent use case.

use crate::config::ExecutionParams;
use crate::ports::llm_gateway::GatewayError;
use calagent_domain::ToolError;
use thiserror::Error;

/// Errors that end an agent run
#[derive(Error, Debug)]
pub enum RunAgentError {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Gateway error: {0}")]
    GatewayError(#[from] GatewayError),

    /// The iteration bound was hit without a final answer
    #[error("could not complete the request (no answer after {max_iterations} iterations)")]
    LoopExceeded { max_iterations: usize },

    /// The tool provider channel failed or closed
    #[error("Session ended: {0}")]
    SessionEnded(ToolError),

    #[error("Session is closed")]
    SessionClosed,

    #[error("Operation cancelled")]
    Cancelled,
}

impl RunAgentError {
    /// Check if this error represents a cancellation
    pub fn is_cancelled(&self) -> bool {
        matches!(self, RunAgentError::Cancelled)
    }

    /// Whether the session can take another user turn after this error.
    pub fn is_session_fatal(&self) -> bool {
        matches!(
            self,
            RunAgentError::SessionEnded(_) | RunAgentError::SessionClosed | RunAgentError::Cancelled
        )
    }

    /// Message for the end user.
    pub fn user_message(&self) -> String {
        match self {
            RunAgentError::LoopExceeded { .. } => "could not complete the request".to_string(),
            other => other.to_string(),
        }
    }
}

/// Input for the RunAgent use case
#[derive(Debug, Clone)]
pub struct RunAgentInput {
    /// The user's request
    pub request: String,
    /// Loop control
    pub execution: ExecutionParams,
}

impl RunAgentInput {
    pub fn new(request: impl Into<String>, execution: ExecutionParams) -> Self {
        Self {
            request: request.into(),
            execution,
        }
    }
}

/// Output from the RunAgent use case
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunAgentOutput {
    /// Final natural-language answer
    pub answer: String,
    /// Reasoning steps taken
    pub iterations: usize,
    /// Tool calls executed
    pub tool_calls: usize,
    /// Tool calls that returned a failure outcome
    pub failed_tool_calls: usize,
}
