//! Tool Executor port
//!
//! Defines the interface for executing tools. In the agent process this is
//! the client proxy to a provider; in tests it is usually the registry
//! itself.

use async_trait::async_trait;
use calagent_domain::{ToolCall, ToolError, ToolSchema, ToolSpec};
use serde_json::Value;

/// Port for tool execution
///
/// Implementations (adapters) live in the infrastructure layer.
#[async_trait]
pub trait ToolExecutorPort: Send + Sync {
    /// Get the specification of all available tools
    fn tool_spec(&self) -> &ToolSpec;

    /// Check if a tool is available
    fn has_tool(&self, name: &str) -> bool {
        self.tool_spec().contains(name)
    }

    /// Get the schema of a specific tool
    fn get_tool(&self, name: &str) -> Option<&ToolSchema> {
        self.tool_spec().get(name)
    }

    /// Get names of all available tools
    fn available_tools(&self) -> Vec<&str> {
        self.tool_spec().names().collect()
    }

    /// Execute a tool call
    async fn execute(&self, call: &ToolCall) -> Result<Value, ToolError>;

    /// Release the resources behind the executor (e.g. the provider channel).
    ///
    /// Outstanding and later calls fail with `channel_closed`.
    async fn close(&self) {}
}
