//! OpenAI-compatible chat-completions gateway.
//!
//! Works against any `/chat/completions` endpoint that supports function
//! tools (Groq by default). Each call to
//! [`next_action`](LlmGateway::next_action) replays the whole transcript:
//!
//! | Turn | Message |
//! |------|---------|
//! | `User` | `{"role": "user", "content"}` |
//! | `Agent` | `{"role": "assistant", "content", "tool_calls"?}` |
//! | `ToolResult` | `{"role": "tool", "tool_call_id", "content"}` |

use std::time::Duration;

use async_trait::async_trait;
use calagent_application::ports::llm_gateway::{GatewayError, LlmGateway};
use calagent_application::ports::tool_schema::ToolSchemaPort;
use calagent_domain::{AgentDecision, ToolCall, ToolSchema, Turn};
use chrono::Utc;
use serde::Deserialize;
use serde_json::{Map, Value, json};
use tracing::{debug, warn};
use zeroize::Zeroizing;

use crate::tools::schema::JsonSchemaToolConverter;

pub const DEFAULT_BASE_URL: &str = "https://api.groq.com/openai/v1";
pub const DEFAULT_MODEL: &str = "meta-llama/llama-4-scout-17b-16e-instruct";
pub const DEFAULT_API_KEY_ENV: &str = "GROQ_API_KEY";

const DEFAULT_SYSTEM_PROMPT: &str = "You are a calendar assistant. \
Use the available tools to create, list and delete calendar events. \
Send times as ISO 8601 in UTC. When you have what you need, answer the user directly.";

#[derive(Debug, Clone)]
pub struct ChatCompletionsConfig {
    pub base_url: String,
    pub model: String,
    pub api_key_env: String,
    pub temperature: Option<f32>,
    pub request_timeout: Duration,
    pub system_prompt: Option<String>,
}

impl Default for ChatCompletionsConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            api_key_env: DEFAULT_API_KEY_ENV.to_string(),
            temperature: None,
            request_timeout: Duration::from_secs(60),
            system_prompt: None,
        }
    }
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    tool_calls: Option<Vec<ResponseToolCall>>,
}

#[derive(Debug, Deserialize)]
struct ResponseToolCall {
    #[serde(default)]
    id: String,
    function: ResponseFunction,
}

#[derive(Debug, Deserialize)]
struct ResponseFunction {
    name: String,
    #[serde(default)]
    arguments: String,
}

pub struct ChatCompletionsGateway {
    client: reqwest::Client,
    endpoint: String,
    api_key: Zeroizing<String>,
    model: String,
    temperature: Option<f32>,
    system_prompt: Option<String>,
    converter: JsonSchemaToolConverter,
}

impl ChatCompletionsGateway {
    /// Build a gateway reading the API key from `config.api_key_env`.
    pub fn new(config: ChatCompletionsConfig) -> Result<Self, GatewayError> {
        let api_key = std::env::var(&config.api_key_env)
            .ok()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| GatewayError::MissingApiKey(config.api_key_env.clone()))?;
        Self::with_api_key(config, api_key)
    }

    pub fn with_api_key(
        config: ChatCompletionsConfig,
        api_key: impl Into<String>,
    ) -> Result<Self, GatewayError> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| GatewayError::ConnectionError(e.to_string()))?;
        Ok(Self {
            client,
            endpoint: format!("{}/chat/completions", config.base_url.trim_end_matches('/')),
            api_key: Zeroizing::new(api_key.into()),
            model: config.model,
            temperature: config.temperature,
            system_prompt: config.system_prompt,
            converter: JsonSchemaToolConverter,
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn system_message(&self) -> Value {
        let prompt = self
            .system_prompt
            .as_deref()
            .unwrap_or(DEFAULT_SYSTEM_PROMPT);
        let today = Utc::now().format("%A, %Y-%m-%d");
        json!({
            "role": "system",
            "content": format!("{}\n\nToday is {} (UTC).", prompt, today),
        })
    }

    fn build_request(&self, turns: &[Turn], tools: &[ToolSchema]) -> Value {
        let mut messages = vec![self.system_message()];
        messages.extend(turns.iter().map(turn_to_message));

        let mut body = json!({
            "model": self.model,
            "messages": messages,
        });
        if !tools.is_empty() {
            body["tools"] = Value::Array(self.converter.all_tools_schema(tools));
            body["tool_choice"] = json!("auto");
        }
        if let Some(temperature) = self.temperature {
            body["temperature"] = json!(temperature);
        }
        body
    }
}

fn turn_to_message(turn: &Turn) -> Value {
    match turn {
        Turn::User { content } => json!({"role": "user", "content": content}),
        Turn::Agent {
            content,
            tool_calls,
        } if tool_calls.is_empty() => json!({"role": "assistant", "content": content}),
        Turn::Agent {
            content,
            tool_calls,
        } => {
            let calls: Vec<Value> = tool_calls
                .iter()
                .map(|call| {
                    json!({
                        "id": call.call_id,
                        "type": "function",
                        "function": {
                            "name": call.tool_name,
                            "arguments": Value::Object(call.arguments.clone()).to_string(),
                        }
                    })
                })
                .collect();
            let content = if content.is_empty() {
                Value::Null
            } else {
                json!(content)
            };
            json!({"role": "assistant", "content": content, "tool_calls": calls})
        }
        Turn::ToolResult {
            call_id, outcome, ..
        } => json!({
            "role": "tool",
            "tool_call_id": call_id,
            "content": outcome.to_content(),
        }),
    }
}

fn parse_arguments(tool: &str, raw: &str) -> Result<Map<String, Value>, GatewayError> {
    let raw = raw.trim();
    if raw.is_empty() || raw == "null" {
        return Ok(Map::new());
    }
    match serde_json::from_str::<Value>(raw) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(other) => Err(GatewayError::InvalidResponse(format!(
            "arguments for {} are not an object: {}",
            tool, other
        ))),
        Err(e) => Err(GatewayError::InvalidResponse(format!(
            "arguments for {} are not JSON: {}",
            tool, e
        ))),
    }
}

fn parse_decision(response: ChatResponse) -> Result<AgentDecision, GatewayError> {
    let message = response
        .choices
        .into_iter()
        .next()
        .map(|c| c.message)
        .ok_or_else(|| GatewayError::InvalidResponse("response has no choices".to_string()))?;

    let tool_calls = message.tool_calls.unwrap_or_default();
    if !tool_calls.is_empty() {
        let calls = tool_calls
            .into_iter()
            .map(|tc| {
                let arguments = parse_arguments(&tc.function.name, &tc.function.arguments)?;
                Ok(ToolCall::new(tc.function.name)
                    .with_call_id(tc.id)
                    .with_arguments(arguments))
            })
            .collect::<Result<Vec<_>, GatewayError>>()?;
        return Ok(AgentDecision::tool_calls(calls));
    }

    Ok(AgentDecision::final_answer(
        message.content.unwrap_or_default().trim(),
    ))
}

#[async_trait]
impl LlmGateway for ChatCompletionsGateway {
    async fn next_action(
        &self,
        turns: &[Turn],
        tools: &[ToolSchema],
    ) -> Result<AgentDecision, GatewayError> {
        let body = self.build_request(turns, tools);
        debug!(model = %self.model, turns = turns.len(), tools = tools.len(), "Requesting next action");

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(self.api_key.as_str())
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    GatewayError::Timeout
                } else {
                    GatewayError::ConnectionError(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            warn!(status = %status, "Chat completions request failed");
            return Err(GatewayError::RequestFailed(format!("{}: {}", status, text)));
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| GatewayError::InvalidResponse(e.to_string()))?;
        let decision = parse_decision(parsed)?;
        debug!(decision = decision.kind(), "Received decision");
        Ok(decision)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use calagent_domain::{ToolError, ToolOutcome};

    fn gateway() -> ChatCompletionsGateway {
        ChatCompletionsGateway::with_api_key(ChatCompletionsConfig::default(), "test-key").unwrap()
    }

    fn response(value: Value) -> ChatResponse {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_text_response_is_final_answer() {
        let decision = parse_decision(response(json!({
            "choices": [{"message": {"role": "assistant", "content": " You have 2 events. "}}]
        })))
        .unwrap();
        assert_eq!(decision, AgentDecision::final_answer("You have 2 events."));
    }

    #[test]
    fn test_tool_calls_response() {
        let decision = parse_decision(response(json!({
            "choices": [{"message": {
                "role": "assistant",
                "content": null,
                "tool_calls": [
                    {"id": "abc", "type": "function",
                     "function": {"name": "delete_event", "arguments": "{\"id\":\"E1\"}"}},
                    {"type": "function",
                     "function": {"name": "get_events", "arguments": ""}}
                ]
            }}]
        })))
        .unwrap();

        let AgentDecision::ToolCalls { calls } = decision else {
            panic!("expected tool calls");
        };
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0].call_id, "abc");
        assert_eq!(calls[0].get_string("id"), Some("E1"));
        assert!(calls[1].call_id.is_empty());
        assert!(calls[1].arguments.is_empty());
    }

    #[test]
    fn test_bad_arguments_are_invalid_response() {
        let result = parse_decision(response(json!({
            "choices": [{"message": {"tool_calls": [
                {"id": "x", "function": {"name": "get_events", "arguments": "[1]"}}
            ]}}]
        })));
        assert!(matches!(result, Err(GatewayError::InvalidResponse(_))));

        let result = parse_decision(response(json!({"choices": []})));
        assert!(matches!(result, Err(GatewayError::InvalidResponse(_))));
    }

    #[test]
    fn test_request_replays_transcript() {
        let call = ToolCall::new("delete_event")
            .with_call_id("call_1")
            .with_arg("id", "E1");
        let turns = vec![
            Turn::user("delete E1"),
            Turn::tool_request(vec![call.clone()]),
            Turn::tool_result(&call, ToolOutcome::failure(ToolError::not_found("E1"))),
        ];
        let body = gateway().build_request(&turns, &[crate::tools::calendar::delete_event_schema()]);

        let messages = body["messages"].as_array().unwrap();
        assert_eq!(messages.len(), 4);
        assert_eq!(messages[0]["role"], "system");
        assert!(messages[0]["content"].as_str().unwrap().contains("Today is"));
        assert_eq!(messages[1], json!({"role": "user", "content": "delete E1"}));
        assert_eq!(messages[2]["tool_calls"][0]["id"], "call_1");
        assert_eq!(
            messages[2]["tool_calls"][0]["function"]["arguments"],
            "{\"id\":\"E1\"}"
        );
        assert!(messages[2]["content"].is_null());
        assert_eq!(messages[3]["role"], "tool");
        assert_eq!(messages[3]["tool_call_id"], "call_1");
        assert!(messages[3]["content"].as_str().unwrap().starts_with("Error:"));

        assert_eq!(body["model"], DEFAULT_MODEL);
        assert_eq!(body["tools"][0]["function"]["name"], "delete_event");
    }

    #[test]
    fn test_missing_api_key() {
        let config = ChatCompletionsConfig {
            api_key_env: "CALAGENT_TEST_KEY_THAT_IS_NOT_SET".to_string(),
            ..ChatCompletionsConfig::default()
        };
        assert!(matches!(
            ChatCompletionsGateway::new(config),
            Err(GatewayError::MissingApiKey(name)) if name == "CALAGENT_TEST_KEY_THAT_IS_NOT_SET"
        ));
    }
}
