//! Conversation domain entities

use crate::tool::{ToolCall, ToolOutcome};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Author of a turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
    Agent,
    ToolResult,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Agent => "agent",
            Role::ToolResult => "tool_result",
        }
    }
}

/// One entry of the conversation transcript.
///
/// An `Agent` turn either carries the final answer (`tool_calls` empty) or
/// records the calls requested by one reasoning step. Each requested call is
/// followed by exactly one `ToolResult` turn with the same `call_id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "role", rename_all = "snake_case")]
pub enum Turn {
    User {
        content: String,
    },
    Agent {
        content: String,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        tool_calls: Vec<ToolCall>,
    },
    ToolResult {
        call_id: String,
        tool_name: String,
        outcome: ToolOutcome,
    },
}

impl Turn {
    pub fn user(content: impl Into<String>) -> Self {
        Turn::User {
            content: content.into(),
        }
    }

    pub fn answer(content: impl Into<String>) -> Self {
        Turn::Agent {
            content: content.into(),
            tool_calls: Vec::new(),
        }
    }

    pub fn tool_request(tool_calls: Vec<ToolCall>) -> Self {
        Turn::Agent {
            content: String::new(),
            tool_calls,
        }
    }

    pub fn tool_result(call: &ToolCall, outcome: ToolOutcome) -> Self {
        Turn::ToolResult {
            call_id: call.call_id.clone(),
            tool_name: call.tool_name.clone(),
            outcome,
        }
    }

    pub fn role(&self) -> Role {
        match self {
            Turn::User { .. } => Role::User,
            Turn::Agent { .. } => Role::Agent,
            Turn::ToolResult { .. } => Role::ToolResult,
        }
    }

    /// Text content of the turn as the reasoning capability reads it.
    pub fn content(&self) -> String {
        match self {
            Turn::User { content } | Turn::Agent { content, .. } => content.clone(),
            Turn::ToolResult { outcome, .. } => outcome.to_content(),
        }
    }
}

/// Ordered, append-only transcript owned by one agent session.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConversationState {
    turns: Vec<Turn>,
}

impl ConversationState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, turn: Turn) {
        self.turns.push(turn);
    }

    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    pub fn last(&self) -> Option<&Turn> {
        self.turns.last()
    }

    /// Turns appended at or after `index`.
    pub fn since(&self, index: usize) -> &[Turn] {
        self.turns.get(index..).unwrap_or(&[])
    }

    /// Give every call an id that no earlier call in this conversation uses.
    ///
    /// Ids sent by the reasoning capability are kept when they are new.
    /// Missing or repeated ids are replaced with the next free `call_<n>`.
    pub fn assign_call_ids(&self, calls: Vec<ToolCall>) -> Vec<ToolCall> {
        let mut used: HashSet<String> = self
            .turns
            .iter()
            .flat_map(|t| match t {
                Turn::Agent { tool_calls, .. } => tool_calls.as_slice(),
                _ => &[][..],
            })
            .map(|c| c.call_id.clone())
            .collect();
        let mut counter = used.len();

        calls
            .into_iter()
            .map(|call| {
                if !call.call_id.is_empty() && used.insert(call.call_id.clone()) {
                    return call;
                }
                let id = loop {
                    counter += 1;
                    let candidate = format!("call_{}", counter);
                    if used.insert(candidate.clone()) {
                        break candidate;
                    }
                };
                call.with_call_id(id)
            })
            .collect()
    }

    /// Number of tool-result turns whose outcome is a failure.
    pub fn failure_count(&self) -> usize {
        self.turns
            .iter()
            .filter(|t| matches!(t, Turn::ToolResult { outcome, .. } if !outcome.is_success()))
            .count()
    }
}
