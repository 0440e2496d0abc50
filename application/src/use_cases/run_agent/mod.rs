//! Run Agent use case
//!
//! The agent loop. For one user request:
//!
//! 1. Append the user turn to the conversation
//! 2. Ask the reasoning capability for the next action
//! 3. Final answer: append it as an agent turn and return
//! 4. Tool calls: append an agent turn recording them, execute them (in
//!    parallel when enabled), append one tool-result turn per call in the
//!    order the calls were requested, then go back to 2
//!
//! The loop is bounded by [`ExecutionParams::max_iterations`]; running out
//! of iterations yields [`RunAgentError::LoopExceeded`]. Tool failures are
//! fed back to the reasoning capability as data, except for channel
//! failures, which end the session.
//!
//! [`ExecutionParams::max_iterations`]: crate::config::ExecutionParams::max_iterations

mod types;

pub use types::{RunAgentError, RunAgentInput, RunAgentOutput};

use crate::ports::agent_progress::{AgentProgressNotifier, NoAgentProgress};
use crate::ports::conversation_logger::{
    ConversationEvent, ConversationLogger, NoConversationLogger,
};
use crate::ports::llm_gateway::LlmGateway;
use crate::ports::tool_executor::ToolExecutorPort;
use crate::use_cases::shared::{cancellable, check_cancelled};
use calagent_domain::{AgentDecision, ConversationState, ToolCall, ToolOutcome, Turn};
use serde_json::json;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Use case for running the agent loop over one user request
pub struct RunAgentUseCase {
    gateway: Arc<dyn LlmGateway>,
    tool_executor: Arc<dyn ToolExecutorPort>,
    conversation_logger: Arc<dyn ConversationLogger>,
    cancellation_token: Option<CancellationToken>,
}

impl Clone for RunAgentUseCase {
    fn clone(&self) -> Self {
        Self {
            gateway: self.gateway.clone(),
            tool_executor: self.tool_executor.clone(),
            conversation_logger: self.conversation_logger.clone(),
            cancellation_token: self.cancellation_token.clone(),
        }
    }
}

impl RunAgentUseCase {
    pub fn new(gateway: Arc<dyn LlmGateway>, tool_executor: Arc<dyn ToolExecutorPort>) -> Self {
        Self {
            gateway,
            tool_executor,
            conversation_logger: Arc::new(NoConversationLogger),
            cancellation_token: None,
        }
    }

    /// Create with a conversation logger.
    pub fn with_conversation_logger(mut self, logger: Arc<dyn ConversationLogger>) -> Self {
        self.conversation_logger = logger;
        self
    }

    /// Set a cancellation token for graceful interruption
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation_token = Some(token);
        self
    }

    pub fn tool_executor(&self) -> &Arc<dyn ToolExecutorPort> {
        &self.tool_executor
    }

    /// Run the loop without progress reporting
    pub async fn execute(
        &self,
        state: &mut ConversationState,
        input: RunAgentInput,
    ) -> Result<RunAgentOutput, RunAgentError> {
        self.execute_with_progress(state, input, &NoAgentProgress)
            .await
    }

    /// Run the loop with progress callbacks
    pub async fn execute_with_progress(
        &self,
        state: &mut ConversationState,
        input: RunAgentInput,
        progress: &dyn AgentProgressNotifier,
    ) -> Result<RunAgentOutput, RunAgentError> {
        check_cancelled(&self.cancellation_token)?;

        let max_iterations = input.execution.max_iterations;
        if max_iterations == 0 {
            return Err(RunAgentError::InvalidConfig(
                "max_iterations must be at least 1".to_string(),
            ));
        }

        info!(max_iterations, "Starting agent for request: {}", input.request);

        state.push(Turn::user(&input.request));
        self.conversation_logger.log(ConversationEvent::new(
            "user_turn",
            json!({ "content": input.request }),
        ));

        let tools = self.tool_executor.tool_spec().schemas();
        let mut tool_call_count = 0;
        let mut failed_count = 0;

        for iteration in 1..=max_iterations {
            progress.on_iteration_start(iteration, max_iterations);
            progress.on_thinking();
            let decision = cancellable(
                &self.cancellation_token,
                self.gateway.next_action(state.turns(), &tools),
            )
            .await;
            progress.on_thinking_done();
            let decision = decision??;

            debug!(iteration, decision = decision.kind(), "Reasoning step complete");
            self.conversation_logger.log(ConversationEvent::new(
                "reasoning_decision",
                json!({ "iteration": iteration, "decision": &decision }),
            ));

            let calls = match decision {
                AgentDecision::FinalAnswer { content } => {
                    state.push(Turn::answer(&content));
                    self.conversation_logger.log(ConversationEvent::new(
                        "final_answer",
                        json!({ "iteration": iteration, "content": &content }),
                    ));
                    info!(
                        iterations = iteration,
                        tool_calls = tool_call_count,
                        "Agent finished"
                    );
                    return Ok(RunAgentOutput {
                        answer: content,
                        iterations: iteration,
                        tool_calls: tool_call_count,
                        failed_tool_calls: failed_count,
                    });
                }
                AgentDecision::ToolCalls { calls } => calls,
            };

            if calls.is_empty() {
                warn!(iteration, "Reasoning step returned no tool calls and no answer");
                continue;
            }

            let calls = state.assign_call_ids(calls);
            state.push(Turn::tool_request(calls.clone()));
            let outcomes = self
                .execute_calls(&calls, input.execution.parallel_tool_calls, progress)
                .await?;

            let mut fatal = None;
            for (call, outcome) in calls.iter().zip(outcomes) {
                tool_call_count += 1;
                progress.on_tool_result(&call.tool_name, &outcome);
                self.conversation_logger.log(ConversationEvent::new(
                    "tool_result",
                    json!({
                        "call_id": call.call_id,
                        "tool": call.tool_name,
                        "outcome": &outcome,
                    }),
                ));

                if let Some(err) = outcome.error() {
                    failed_count += 1;
                    warn!(tool = %call.tool_name, "Tool call failed: {}", err);
                    if err.is_session_fatal() && fatal.is_none() {
                        fatal = Some(err.clone());
                    }
                }
                state.push(Turn::tool_result(call, outcome));
            }

            if let Some(err) = fatal {
                warn!("Tool provider channel lost, ending session");
                return Err(RunAgentError::SessionEnded(err));
            }
        }

        warn!(max_iterations, "Agent loop exceeded iteration bound");
        progress.on_loop_exceeded(max_iterations);
        self.conversation_logger.log(ConversationEvent::new(
            "loop_exceeded",
            json!({ "max_iterations": max_iterations }),
        ));
        Err(RunAgentError::LoopExceeded { max_iterations })
    }

    /// Execute the calls of one reasoning step.
    ///
    /// Outcomes are returned in the order of `calls` regardless of the order
    /// in which they complete.
    async fn execute_calls(
        &self,
        calls: &[ToolCall],
        parallel: bool,
        progress: &dyn AgentProgressNotifier,
    ) -> Result<Vec<ToolOutcome>, RunAgentError> {
        for call in calls {
            let preview = tool_args_preview(call);
            debug!(tool = %call.tool_name, call_id = %call.call_id, "Calling tool");
            progress.on_tool_call(&call.tool_name, &preview);
            self.conversation_logger.log(ConversationEvent::new(
                "tool_call",
                json!({
                    "call_id": call.call_id,
                    "tool": call.tool_name,
                    "arguments": call.arguments,
                }),
            ));
        }

        let results = if parallel && calls.len() > 1 {
            let futures = calls.iter().map(|call| self.tool_executor.execute(call));
            cancellable(&self.cancellation_token, futures::future::join_all(futures)).await?
        } else {
            let mut results = Vec::with_capacity(calls.len());
            for call in calls {
                results.push(
                    cancellable(&self.cancellation_token, self.tool_executor.execute(call))
                        .await?,
                );
            }
            results
        };

        Ok(results.into_iter().map(ToolOutcome::from).collect())
    }
}

fn tool_args_preview(call: &ToolCall) -> String {
    let text = serde_json::to_string(&call.arguments).unwrap_or_default();
    if text.chars().count() > 200 {
        let cut: String = text.chars().take(200).collect();
        format!("{}...", cut)
    } else {
        text
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ExecutionParams;
    use crate::ports::llm_gateway::GatewayError;
    use async_trait::async_trait;
    use calagent_domain::{ToolError, ToolErrorKind, ToolSchema, ToolSpec};
    use serde_json::Value;
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    // ==================== Test Mocks ====================

    struct ScriptedGateway {
        decisions: Mutex<VecDeque<AgentDecision>>,
        fallback: Option<AgentDecision>,
        calls: AtomicUsize,
    }

    impl ScriptedGateway {
        fn new(decisions: Vec<AgentDecision>) -> Self {
            Self {
                decisions: Mutex::new(VecDeque::from(decisions)),
                fallback: None,
                calls: AtomicUsize::new(0),
            }
        }

        fn repeating(decision: AgentDecision) -> Self {
            Self {
                fallback: Some(decision),
                ..Self::new(vec![])
            }
        }

        fn call_count(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl LlmGateway for ScriptedGateway {
        async fn next_action(
            &self,
            _turns: &[Turn],
            _tools: &[ToolSchema],
        ) -> Result<AgentDecision, GatewayError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if let Some(next) = self.decisions.lock().unwrap().pop_front() {
                return Ok(next);
            }
            self.fallback
                .clone()
                .ok_or_else(|| GatewayError::Other("No more responses".to_string()))
        }
    }

    struct PendingGateway;

    #[async_trait]
    impl LlmGateway for PendingGateway {
        async fn next_action(
            &self,
            _turns: &[Turn],
            _tools: &[ToolSchema],
        ) -> Result<AgentDecision, GatewayError> {
            futures::future::pending().await
        }
    }

    /// `slow` sleeps for `delay_ms` then echoes `tag`; `delete_event` never
    /// finds anything; `broken` reports a closed channel.
    struct MockToolExecutor {
        spec: ToolSpec,
        executed: AtomicUsize,
    }

    impl MockToolExecutor {
        fn new() -> Self {
            Self {
                spec: ToolSpec::from_schemas([
                    ToolSchema::new("slow", "Sleeps then echoes"),
                    ToolSchema::new("delete_event", "Delete an event"),
                    ToolSchema::new("broken", "Always loses the channel"),
                ])
                .unwrap(),
                executed: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl ToolExecutorPort for MockToolExecutor {
        fn tool_spec(&self) -> &ToolSpec {
            &self.spec
        }

        async fn execute(&self, call: &ToolCall) -> Result<Value, ToolError> {
            self.executed.fetch_add(1, Ordering::SeqCst);
            match call.tool_name.as_str() {
                "slow" => {
                    let delay = call
                        .arguments
                        .get("delay_ms")
                        .and_then(|v| v.as_u64())
                        .unwrap_or(0);
                    tokio::time::sleep(Duration::from_millis(delay)).await;
                    Ok(serde_json::json!({ "tag": call.get_string("tag") }))
                }
                "delete_event" => Err(ToolError::not_found(call.get_string("id").unwrap_or(""))),
                "broken" => Err(ToolError::channel_closed()),
                other => Err(ToolError::unknown_tool(other)),
            }
        }
    }

    #[derive(Default)]
    struct RecordingLogger {
        events: Mutex<Vec<&'static str>>,
    }

    impl ConversationLogger for RecordingLogger {
        fn log(&self, event: ConversationEvent) {
            self.events.lock().unwrap().push(event.event_type);
        }
    }

    fn slow_call(tag: &str, delay_ms: u64) -> ToolCall {
        ToolCall::new("slow")
            .with_arg("tag", tag)
            .with_arg("delay_ms", delay_ms)
    }

    fn use_case(gateway: Arc<dyn LlmGateway>) -> (RunAgentUseCase, Arc<MockToolExecutor>) {
        let executor = Arc::new(MockToolExecutor::new());
        (RunAgentUseCase::new(gateway, executor.clone()), executor)
    }

    fn input(request: &str, max_iterations: usize) -> RunAgentInput {
        RunAgentInput::new(
            request,
            ExecutionParams::default().with_max_iterations(max_iterations),
        )
    }

    // ==================== Tests ====================

    #[tokio::test]
    async fn test_immediate_final_answer() {
        let gateway = Arc::new(ScriptedGateway::new(vec![AgentDecision::final_answer(
            "Hello!",
        )]));
        let (uc, _) = use_case(gateway.clone());
        let mut state = ConversationState::new();

        let output = uc.execute(&mut state, input("hi", 5)).await.unwrap();

        assert_eq!(output.answer, "Hello!");
        assert_eq!(output.iterations, 1);
        assert_eq!(output.tool_calls, 0);
        assert_eq!(state.turns(), &[Turn::user("hi"), Turn::answer("Hello!")]);
    }

    #[tokio::test]
    async fn test_tool_call_then_answer_builds_transcript() {
        let gateway = Arc::new(ScriptedGateway::new(vec![
            AgentDecision::tool_calls(vec![slow_call("a", 0)]),
            AgentDecision::final_answer("done"),
        ]));
        let (uc, executor) = use_case(gateway.clone());
        let mut state = ConversationState::new();

        let output = uc.execute(&mut state, input("do it", 5)).await.unwrap();

        assert_eq!(output.iterations, 2);
        assert_eq!(output.tool_calls, 1);
        assert_eq!(executor.executed.load(Ordering::SeqCst), 1);

        let turns = state.turns();
        assert_eq!(turns.len(), 4);
        assert!(matches!(&turns[1], Turn::Agent { tool_calls, .. } if tool_calls.len() == 1));
        match &turns[2] {
            Turn::ToolResult {
                call_id,
                tool_name,
                outcome,
            } => {
                assert_eq!(call_id, "call_1");
                assert_eq!(tool_name, "slow");
                assert_eq!(
                    outcome,
                    &ToolOutcome::success(serde_json::json!({"tag": "a"}))
                );
            }
            other => panic!("expected tool result, got {:?}", other),
        }
        assert_eq!(turns[3], Turn::answer("done"));
    }

    #[tokio::test]
    async fn test_parallel_results_keep_request_order() {
        let gateway = Arc::new(ScriptedGateway::new(vec![
            AgentDecision::tool_calls(vec![
                slow_call("first", 80),
                slow_call("second", 0),
                slow_call("third", 30),
            ]),
            AgentDecision::final_answer("ok"),
        ]));
        let (uc, _) = use_case(gateway);
        let mut state = ConversationState::new();

        uc.execute(&mut state, input("go", 3)).await.unwrap();

        let tags: Vec<_> = state
            .turns()
            .iter()
            .filter_map(|t| match t {
                Turn::ToolResult {
                    outcome: ToolOutcome::Success { value },
                    ..
                } => value["tag"].as_str().map(String::from),
                _ => None,
            })
            .collect();
        assert_eq!(tags, vec!["first", "second", "third"]);
    }

    #[tokio::test]
    async fn test_sequential_dispatch_keeps_order() {
        let gateway = Arc::new(ScriptedGateway::new(vec![
            AgentDecision::tool_calls(vec![slow_call("x", 10), slow_call("y", 0)]),
            AgentDecision::final_answer("ok"),
        ]));
        let (uc, _) = use_case(gateway);
        let mut state = ConversationState::new();
        let input = RunAgentInput::new(
            "go",
            ExecutionParams::default().with_parallel_tool_calls(false),
        );

        let output = uc.execute(&mut state, input).await.unwrap();
        assert_eq!(output.tool_calls, 2);
        let ids: Vec<_> = state
            .turns()
            .iter()
            .filter_map(|t| match t {
                Turn::ToolResult { call_id, .. } => Some(call_id.clone()),
                _ => None,
            })
            .collect();
        assert_eq!(ids, vec!["call_1", "call_2"]);
    }

    #[tokio::test]
    async fn test_call_ids_unique_across_steps() {
        let gateway = Arc::new(ScriptedGateway::new(vec![
            AgentDecision::tool_calls(vec![slow_call("a", 0).with_call_id("dup")]),
            AgentDecision::tool_calls(vec![
                slow_call("b", 0).with_call_id("dup"),
                slow_call("c", 0),
            ]),
            AgentDecision::final_answer("ok"),
        ]));
        let (uc, _) = use_case(gateway);
        let mut state = ConversationState::new();

        uc.execute(&mut state, input("go", 5)).await.unwrap();

        let requested: Vec<_> = state
            .turns()
            .iter()
            .flat_map(|t| match t {
                Turn::Agent { tool_calls, .. } => tool_calls.clone(),
                _ => Vec::new(),
            })
            .map(|c| c.call_id)
            .collect();
        let results: Vec<_> = state
            .turns()
            .iter()
            .filter_map(|t| match t {
                Turn::ToolResult { call_id, .. } => Some(call_id.clone()),
                _ => None,
            })
            .collect();
        assert_eq!(requested, vec!["dup", "call_2", "call_3"]);
        assert_eq!(results, requested);
    }

    #[tokio::test]
    async fn test_loop_exceeded_after_bound() {
        let gateway = Arc::new(ScriptedGateway::repeating(AgentDecision::tool_calls(vec![
            slow_call("again", 0),
        ])));
        let (uc, _) = use_case(gateway.clone());
        let mut state = ConversationState::new();

        let err = uc.execute(&mut state, input("loop", 3)).await.unwrap_err();

        assert!(matches!(err, RunAgentError::LoopExceeded { max_iterations: 3 }));
        assert_eq!(err.user_message(), "could not complete the request");
        assert!(!err.is_session_fatal());
        assert_eq!(gateway.call_count(), 3);
    }

    #[tokio::test]
    async fn test_tool_failure_is_fed_back_not_fatal() {
        let gateway = Arc::new(ScriptedGateway::new(vec![
            AgentDecision::tool_calls(vec![
                ToolCall::new("delete_event").with_arg("id", "does-not-exist"),
            ]),
            AgentDecision::final_answer("That event does not exist."),
        ]));
        let (uc, _) = use_case(gateway);
        let mut state = ConversationState::new();

        let output = uc.execute(&mut state, input("delete it", 5)).await.unwrap();

        assert_eq!(output.failed_tool_calls, 1);
        assert_eq!(state.failure_count(), 1);
        let failure = state
            .turns()
            .iter()
            .find_map(|t| match t {
                Turn::ToolResult { outcome, .. } => outcome.error().cloned(),
                _ => None,
            })
            .unwrap();
        assert_eq!(failure.kind, ToolErrorKind::NotFound);
    }

    #[tokio::test]
    async fn test_channel_closed_ends_session_after_recording_result() {
        let gateway = Arc::new(ScriptedGateway::new(vec![
            AgentDecision::tool_calls(vec![ToolCall::new("broken"), slow_call("still", 0)]),
            AgentDecision::final_answer("unreachable"),
        ]));
        let (uc, _) = use_case(gateway.clone());
        let mut state = ConversationState::new();

        let err = uc.execute(&mut state, input("go", 5)).await.unwrap_err();

        assert!(matches!(&err, RunAgentError::SessionEnded(e) if e.kind == ToolErrorKind::ChannelClosed));
        assert!(err.is_session_fatal());
        assert_eq!(gateway.call_count(), 1);
        // user, agent request, two results
        assert_eq!(state.len(), 4);
    }

    #[tokio::test]
    async fn test_zero_iterations_is_invalid() {
        let gateway = Arc::new(ScriptedGateway::new(vec![]));
        let (uc, _) = use_case(gateway);
        let mut state = ConversationState::new();

        let err = uc.execute(&mut state, input("x", 0)).await.unwrap_err();
        assert!(matches!(err, RunAgentError::InvalidConfig(_)));
        assert!(state.is_empty());
    }

    #[tokio::test]
    async fn test_cancelled_before_start() {
        let token = CancellationToken::new();
        token.cancel();
        let (uc, _) = use_case(Arc::new(ScriptedGateway::new(vec![])));
        let uc = uc.with_cancellation(token);
        let mut state = ConversationState::new();

        let err = uc.execute(&mut state, input("x", 3)).await.unwrap_err();
        assert!(err.is_cancelled());
    }

    #[tokio::test]
    async fn test_cancel_interrupts_pending_reasoning() {
        let token = CancellationToken::new();
        let (uc, _) = use_case(Arc::new(PendingGateway));
        let uc = uc.with_cancellation(token.clone());
        let mut state = ConversationState::new();

        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            token.cancel();
        });

        let err = uc.execute(&mut state, input("x", 3)).await.unwrap_err();
        assert!(err.is_cancelled());
    }

    #[tokio::test]
    async fn test_gateway_error_propagates() {
        let (uc, _) = use_case(Arc::new(ScriptedGateway::new(vec![])));
        let mut state = ConversationState::new();

        let err = uc.execute(&mut state, input("x", 3)).await.unwrap_err();
        assert!(matches!(err, RunAgentError::GatewayError(_)));
    }

    #[tokio::test]
    async fn test_transcript_events_are_logged() {
        let gateway = Arc::new(ScriptedGateway::new(vec![
            AgentDecision::tool_calls(vec![slow_call("a", 0)]),
            AgentDecision::final_answer("done"),
        ]));
        let logger = Arc::new(RecordingLogger::default());
        let (uc, _) = use_case(gateway);
        let uc = uc.with_conversation_logger(logger.clone());
        let mut state = ConversationState::new();

        uc.execute(&mut state, input("go", 3)).await.unwrap();

        assert_eq!(
            *logger.events.lock().unwrap(),
            vec![
                "user_turn",
                "reasoning_decision",
                "tool_call",
                "tool_result",
                "reasoning_decision",
                "final_answer",
            ]
        );
    }
}
