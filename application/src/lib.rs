//! Application layer for calendar-agent
//!
//! This crate contains the agent loop, the conversation session, and the port
//! definitions that infrastructure adapters implement.
//! It depends only on the domain layer.

pub mod config;
pub mod ports;
pub mod use_cases;

// Re-export commonly used types
pub use config::ExecutionParams;
pub use ports::{
    agent_progress::{AgentProgressNotifier, NoAgentProgress},
    calendar_backend::{BackendError, CalendarBackend},
    conversation_logger::{ConversationEvent, ConversationLogger, NoConversationLogger},
    llm_gateway::{GatewayError, LlmGateway},
    tool_executor::ToolExecutorPort,
    tool_schema::ToolSchemaPort,
};
pub use use_cases::run_agent::{RunAgentError, RunAgentInput, RunAgentOutput, RunAgentUseCase};
pub use use_cases::session::ConversationSession;
