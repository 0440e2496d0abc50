//! Conversation session
//!
//! Binds one agent loop to one set of discovered tools for the lifetime of a
//! provider connection. The session owns the conversation state, threads it
//! through every user turn, and on close cancels in-flight waits and releases
//! the tool executor.

use crate::config::ExecutionParams;
use crate::ports::agent_progress::AgentProgressNotifier;
use crate::ports::conversation_logger::ConversationLogger;
use crate::ports::llm_gateway::LlmGateway;
use crate::ports::tool_executor::ToolExecutorPort;
use crate::use_cases::run_agent::{RunAgentError, RunAgentInput, RunAgentOutput, RunAgentUseCase};
use calagent_domain::ConversationState;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

pub struct ConversationSession {
    agent: RunAgentUseCase,
    execution: ExecutionParams,
    state: ConversationState,
    cancellation_token: CancellationToken,
    closed: bool,
}

impl ConversationSession {
    pub fn new(
        gateway: Arc<dyn LlmGateway>,
        tool_executor: Arc<dyn ToolExecutorPort>,
        execution: ExecutionParams,
    ) -> Self {
        let cancellation_token = CancellationToken::new();
        let agent = RunAgentUseCase::new(gateway, tool_executor)
            .with_cancellation(cancellation_token.clone());
        Self {
            agent,
            execution,
            state: ConversationState::new(),
            cancellation_token,
            closed: false,
        }
    }

    pub fn with_conversation_logger(mut self, logger: Arc<dyn ConversationLogger>) -> Self {
        self.agent = self.agent.with_conversation_logger(logger);
        self
    }

    /// Token that cancels whatever the session is currently waiting on.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancellation_token.clone()
    }

    pub fn state(&self) -> &ConversationState {
        &self.state
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Names of the tools this session can call.
    pub fn tool_names(&self) -> Vec<String> {
        self.agent
            .tool_executor()
            .available_tools()
            .into_iter()
            .map(String::from)
            .collect()
    }

    /// Run the agent loop for one user request.
    ///
    /// Session-fatal errors close the session; later calls fail with
    /// [`RunAgentError::SessionClosed`].
    pub async fn send(
        &mut self,
        request: &str,
        progress: &dyn AgentProgressNotifier,
    ) -> Result<RunAgentOutput, RunAgentError> {
        if self.closed {
            return Err(RunAgentError::SessionClosed);
        }

        let input = RunAgentInput::new(request, self.execution.clone());
        let result = self
            .agent
            .execute_with_progress(&mut self.state, input, progress)
            .await;

        if let Err(err) = &result
            && err.is_session_fatal()
        {
            debug!("Closing session after fatal error: {}", err);
            self.close().await;
        }
        result
    }

    /// Cancel in-flight waits and release the tool executor. Idempotent.
    pub async fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        self.cancellation_token.cancel();
        self.agent.tool_executor().close().await;
        info!(turns = self.state.len(), "Session closed");
    }
}
