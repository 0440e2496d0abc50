//! Domain layer for calendar-agent
//!
//! This crate contains the core types of the tool protocol and the agent
//! loop. It has no dependencies on infrastructure or presentation concerns.
//!
//! # Core Concepts
//!
//! ## Tools
//!
//! A tool is published as a [`ToolSchema`]: ordered, typed input fields and
//! an output type. Arguments are checked structurally by [`SchemaValidator`]
//! before a call crosses the process boundary and again before a handler
//! runs.
//!
//! ## Conversation
//!
//! A session's [`ConversationState`] is an append-only list of [`Turn`]s.
//! Tool failures are recorded as data ([`ToolOutcome::Failure`]) so the
//! reasoning capability can decide what to do next.

pub mod agent;
pub mod calendar;
pub mod conversation;
pub mod tool;

// Re-export commonly used types
pub use agent::AgentDecision;
pub use calendar::{CalendarEvent, DeletedEvent, EventError, NewEvent, TimeRange};
pub use conversation::{ConversationState, Role, Turn};
pub use tool::{
    FieldSpec, SchemaError, SchemaValidator, ToolCall, ToolError, ToolErrorKind, ToolHandler,
    ToolOutcome, ToolSchema, ToolSpec, ToolValidator, ValidationError, ValueType, parse_datetime,
};
