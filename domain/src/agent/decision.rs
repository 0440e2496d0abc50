//! Decision produced by one reasoning step

use crate::tool::ToolCall;
use serde::{Deserialize, Serialize};

/// What the reasoning capability wants to do next.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "decision", rename_all = "snake_case")]
pub enum AgentDecision {
    /// Natural-language answer that ends the loop
    FinalAnswer { content: String },
    /// Calls to execute, in the order they were requested
    ToolCalls { calls: Vec<ToolCall> },
}

impl AgentDecision {
    pub fn final_answer(content: impl Into<String>) -> Self {
        AgentDecision::FinalAnswer {
            content: content.into(),
        }
    }

    /// Build a tool-call decision.
    ///
    /// Call ids are kept as the reasoning capability sent them, possibly
    /// empty. The conversation assigns the final ids when the calls are
    /// recorded (see `ConversationState::assign_call_ids`).
    pub fn tool_calls(calls: Vec<ToolCall>) -> Self {
        AgentDecision::ToolCalls { calls }
    }

    pub fn is_final(&self) -> bool {
        matches!(self, AgentDecision::FinalAnswer { .. })
    }

    /// Short label for logs and transcripts.
    pub fn kind(&self) -> &'static str {
        match self {
            AgentDecision::FinalAnswer { .. } => "final_answer",
            AgentDecision::ToolCalls { .. } => "tool_calls",
        }
    }
}
