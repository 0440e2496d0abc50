//! LLM Gateway port
//!
//! Defines the interface to the external reasoning capability: given the
//! conversation so far and the available tool schemas, decide what to do
//! next.

use async_trait::async_trait;
use calagent_domain::{AgentDecision, ToolSchema, Turn};
use thiserror::Error;

/// Errors that can occur during LLM gateway operations
#[derive(Error, Debug)]
pub enum GatewayError {
    #[error("Connection error: {0}")]
    ConnectionError(String),

    #[error("Request failed: {0}")]
    RequestFailed(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Missing API key: environment variable {0} is not set")]
    MissingApiKey(String),

    #[error("Timeout")]
    Timeout,

    #[error("Other error: {0}")]
    Other(String),
}

/// Gateway for LLM communication
///
/// This port defines how the application layer asks for the next action.
/// Implementations (adapters) live in the infrastructure layer.
#[async_trait]
pub trait LlmGateway: Send + Sync {
    /// Return either a final answer or an ordered list of tool calls.
    async fn next_action(
        &self,
        turns: &[Turn],
        tools: &[ToolSchema],
    ) -> Result<AgentDecision, GatewayError>;
}
