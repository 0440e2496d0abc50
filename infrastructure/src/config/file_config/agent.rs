//! Agent configuration from TOML (`[agent]` section)

use calagent_application::ExecutionParams;
use serde::{Deserialize, Serialize};

/// Raw agent configuration from TOML
///
/// # Example
///
/// ```toml
/// [agent]
/// max_iterations = 8
/// parallel_tool_calls = true
/// system_prompt = "You manage my work calendar."
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FileAgentConfig {
    /// Reasoning steps allowed per user turn
    pub max_iterations: usize,
    /// Run the calls of one reasoning step concurrently
    pub parallel_tool_calls: bool,
    /// Replaces the built-in system prompt
    pub system_prompt: Option<String>,
}

impl Default for FileAgentConfig {
    fn default() -> Self {
        let defaults = ExecutionParams::default();
        Self {
            max_iterations: defaults.max_iterations,
            parallel_tool_calls: defaults.parallel_tool_calls,
            system_prompt: None,
        }
    }
}

impl FileAgentConfig {
    pub fn to_execution_params(&self) -> ExecutionParams {
        ExecutionParams::default()
            .with_max_iterations(self.max_iterations)
            .with_parallel_tool_calls(self.parallel_tool_calls)
    }
}
