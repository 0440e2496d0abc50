//! Agent execution progress port.
//!
//! [`AgentProgressNotifier`] is an **output port** that the presentation layer
//! implements to display agent progress to the user. All callback argument
//! types come from the domain layer.
//!
//! All methods have default no-op implementations, so implementers only
//! need to override the callbacks they care about.

use calagent_domain::ToolOutcome;

pub trait AgentProgressNotifier: Send + Sync {
    /// Called before each reasoning step
    fn on_iteration_start(&self, _iteration: usize, _max_iterations: usize) {}

    /// Called while waiting for the reasoning capability
    fn on_thinking(&self) {}

    /// Called when the reasoning capability has answered
    fn on_thinking_done(&self) {}

    /// Called when a tool is invoked
    fn on_tool_call(&self, _tool_name: &str, _args: &str) {}

    /// Called when a tool returns
    fn on_tool_result(&self, _tool_name: &str, _outcome: &ToolOutcome) {}

    /// Called when the iteration bound is hit
    fn on_loop_exceeded(&self, _max_iterations: usize) {}
}

/// No-op progress notifier
pub struct NoAgentProgress;

impl AgentProgressNotifier for NoAgentProgress {}
