//! Execution parameters for agent loop control
//!
//! [`ExecutionParams`] groups the static parameters that control the
//! loop in [`RunAgentUseCase`](crate::use_cases::run_agent::RunAgentUseCase).
//! These are application-layer concerns, not domain policy.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionParams {
    /// Maximum number of reasoning steps per user turn.
    pub max_iterations: usize,
    /// Dispatch the calls of one reasoning step concurrently.
    pub parallel_tool_calls: bool,
}

impl Default for ExecutionParams {
    fn default() -> Self {
        Self {
            max_iterations: 8,
            parallel_tool_calls: true,
        }
    }
}

impl ExecutionParams {
    // ==================== Builder Methods ====================

    pub fn with_max_iterations(mut self, max: usize) -> Self {
        self.max_iterations = max;
        self
    }

    pub fn with_parallel_tool_calls(mut self, parallel: bool) -> Self {
        self.parallel_tool_calls = parallel;
        self
    }
}
