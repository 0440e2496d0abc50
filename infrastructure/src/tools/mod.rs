//! Tools served by the provider
//!
//! - `registry`: schema + handler bookkeeping, implements `ToolExecutorPort`
//! - `calendar`: `create_event`, `get_events`, `delete_event`
//! - `schema`: JSON Schema rendering for reasoning APIs

pub mod calendar;
pub mod registry;
pub mod schema;

pub use calendar::calendar_registry;
pub use registry::{RegistryError, ToolRegistry, registry_error_to_tool_error};
pub use schema::JsonSchemaToolConverter;
