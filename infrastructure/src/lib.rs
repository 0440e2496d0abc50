//! Infrastructure layer for calendar-agent
//!
//! This crate contains adapters that implement the ports defined
//! in the application layer: the tool protocol (provider endpoint and
//! agent-side client), calendar backends, the reasoning gateway,
//! configuration file loading and the conversation transcript.

pub mod calendar;
pub mod config;
pub mod logging;
pub mod providers;
pub mod rpc;
pub mod tools;

// Re-export commonly used types
pub use calendar::{CalendarCredential, GoogleCalendarBackend, InMemoryCalendar};
pub use config::{CalendarBackendKind, ConfigError, ConfigLoader, FileConfig};
pub use logging::JsonlConversationLogger;
pub use providers::{ChatCompletionsConfig, ChatCompletionsGateway};
pub use rpc::{Channel, ClientError, ClientOptions, ProviderProcess, ToolClient, ToolServer};
pub use tools::{JsonSchemaToolConverter, ToolRegistry, calendar_registry};
