//! Tool domain module
//!
//! Defines what a tool *is* independent of where it runs: the published
//! [`ToolSchema`], a [`ToolCall`] against it, the [`ToolOutcome`] that comes
//! back, and the structural [`ToolValidator`] used on both sides of the
//! process boundary.
//!
//! ```text
//! ┌──────────────┐    ┌──────────────┐    ┌──────────────┐
//! │ ToolSpec     │───▶│ ToolCall     │───▶│ ToolOutcome  │
//! │ (schemas)    │    │ (invocation) │    │ (result)     │
//! └──────────────┘    └──────────────┘    └──────────────┘
//! ```
//!
//! - **Domain** (this module): pure definitions, no I/O
//! - **Application** (`ToolExecutorPort`): port for executing calls
//! - **Infrastructure** (`ToolRegistry`, `ToolClient`): in-process handlers
//!   and the proxy that forwards calls to a provider process

pub mod entities;
pub mod handler;
pub mod schema;
pub mod traits;
pub mod value_objects;

pub use entities::{ToolCall, ToolSpec};
pub use handler::ToolHandler;
pub use schema::{FieldSpec, SchemaError, ToolSchema, ValueType, parse_datetime};
pub use traits::{SchemaValidator, ToolValidator, ValidationError};
pub use value_objects::{ToolError, ToolErrorKind, ToolOutcome};
