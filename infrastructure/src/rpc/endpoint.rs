//! Tool Provider Endpoint
//!
//! Serves a [`ToolRegistry`] over one [`Channel`].
//!
//! ```text
//! AwaitingDiscovery ──tools/list──▶ Serving ──shutdown / EOF──▶ Closed
//!        │                                                      ▲
//!        └────────────────────shutdown / EOF────────────────────┘
//! ```
//!
//! Each `tools/call` runs on its own task so a slow backend call does not
//! hold up other requests. Responses go out through the shared writer in
//! completion order and the client matches them by id.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use calagent_domain::{ToolError, ToolOutcome};
use futures::FutureExt;
use serde::Serialize;
use serde_json::Value;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use super::channel::{Channel, ChannelWriter};
use super::error::ChannelError;
use super::protocol::{
    InitializeResult, JsonRpcResponse, PROTOCOL_VERSION, RpcError, ToolCallParams,
    ToolsListResult, methods,
};
use super::transport::{MessageKind, classify_message};
use crate::tools::registry::{ToolRegistry, registry_error_to_tool_error};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndpointState {
    AwaitingDiscovery,
    Serving,
    Closed,
}

pub struct ToolServer {
    registry: Arc<ToolRegistry>,
    name: String,
    version: String,
    call_timeout: Option<Duration>,
}

impl ToolServer {
    pub fn new(registry: Arc<ToolRegistry>) -> Self {
        Self {
            registry,
            name: env!("CARGO_PKG_NAME").to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            call_timeout: None,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Bound each handler invocation. Calls that run longer fail with a
    /// `timeout` outcome.
    pub fn with_call_timeout(mut self, timeout: Duration) -> Self {
        self.call_timeout = Some(timeout);
        self
    }

    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    /// Serve requests until `shutdown` or until the peer closes the channel.
    ///
    /// Returns `Err` only when the channel itself fails and cannot be read
    /// any further.
    pub async fn serve(&self, channel: Channel) -> Result<EndpointState, ChannelError> {
        let (mut reader, writer) = channel.split();
        let writer = Arc::new(writer);
        let mut state = EndpointState::AwaitingDiscovery;
        let mut calls: JoinSet<()> = JoinSet::new();

        info!(tools = self.registry.len(), "Tool provider serving");

        while state != EndpointState::Closed {
            while let Some(finished) = calls.try_join_next() {
                if let Err(e) = finished {
                    warn!(error = %e, "Tool call task failed");
                }
            }

            let message = match reader.receive().await {
                Ok(Some(message)) => message,
                Ok(None) => {
                    info!("Agent closed the channel");
                    calls.abort_all();
                    state = EndpointState::Closed;
                    break;
                }
                Err(e) if e.is_recoverable() => {
                    warn!(error = %e, "Malformed message");
                    respond(&writer, JsonRpcResponse::failure(None, RpcError::parse_error(&e))).await;
                    continue;
                }
                Err(e) => {
                    warn!(error = %e, "Channel failed");
                    calls.abort_all();
                    writer.close().await;
                    return Err(e);
                }
            };

            match classify_message(&message) {
                MessageKind::Request { id, method } => {
                    debug!(request_id = id, method = %method, "Request");
                    let params = message.get("params").cloned();
                    match method.as_str() {
                        methods::INITIALIZE => {
                            let result = InitializeResult {
                                name: self.name.clone(),
                                version: self.version.clone(),
                                protocol_version: PROTOCOL_VERSION.to_string(),
                            };
                            respond_with(&writer, id, &result).await;
                        }
                        methods::TOOLS_LIST => {
                            state = EndpointState::Serving;
                            let result = ToolsListResult {
                                tools: self.registry.list(),
                            };
                            respond_with(&writer, id, &result).await;
                        }
                        methods::TOOLS_CALL if state != EndpointState::Serving => {
                            respond(&writer, JsonRpcResponse::failure(Some(id), RpcError::not_discovered()))
                                .await;
                        }
                        methods::TOOLS_CALL => {
                            let params: ToolCallParams =
                                match params.map(serde_json::from_value).transpose() {
                                    Ok(Some(params)) => params,
                                    Ok(None) => {
                                        let error = RpcError::invalid_params("missing params");
                                        respond(&writer, JsonRpcResponse::failure(Some(id), error)).await;
                                        continue;
                                    }
                                    Err(e) => {
                                        let error = RpcError::invalid_params(e);
                                        respond(&writer, JsonRpcResponse::failure(Some(id), error)).await;
                                        continue;
                                    }
                                };
                            calls.spawn(run_call(
                                self.registry.clone(),
                                writer.clone(),
                                self.call_timeout,
                                id,
                                params,
                            ));
                        }
                        methods::SHUTDOWN => {
                            info!(in_flight = calls.len(), "Shutdown requested");
                            while let Some(finished) = calls.join_next().await {
                                if let Err(e) = finished {
                                    warn!(error = %e, "Tool call task failed");
                                }
                            }
                            respond(&writer, JsonRpcResponse::success(id, Value::Null)).await;
                            state = EndpointState::Closed;
                        }
                        other => {
                            respond(&writer, JsonRpcResponse::failure(Some(id), RpcError::method_not_found(other)))
                                .await;
                        }
                    }
                }
                MessageKind::Notification { method } => {
                    debug!(method = %method, "Ignoring notification");
                }
                MessageKind::UnsupportedId { id, method } => {
                    warn!(id = %id, method = %method, "Request id is not an unsigned integer");
                    let error = RpcError::invalid_request("request id must be an unsigned integer");
                    send_value(
                        &writer,
                        serde_json::json!({"jsonrpc": "2.0", "id": id, "error": error}),
                    )
                    .await;
                }
                MessageKind::Response { id } => {
                    debug!(request_id = id, "Ignoring unexpected response");
                }
                MessageKind::Invalid => {
                    let error = RpcError::invalid_request("expected a request with an integer id and a method");
                    respond(&writer, JsonRpcResponse::failure(None, error)).await;
                }
            }
        }

        writer.close().await;
        Ok(state)
    }
}

async fn run_call(
    registry: Arc<ToolRegistry>,
    writer: Arc<ChannelWriter>,
    call_timeout: Option<Duration>,
    id: u64,
    params: ToolCallParams,
) {
    let ToolCallParams { name, arguments } = params;
    // A panicking handler still owes the caller exactly one outcome
    let invocation = AssertUnwindSafe(registry.invoke(&name, arguments))
        .catch_unwind()
        .map(|caught| match caught {
            Ok(result) => result.map_err(registry_error_to_tool_error),
            Err(_) => {
                warn!(request_id = id, tool = %name, "Tool handler panicked");
                Err(ToolError::handler(format!("tool '{}' panicked", name)))
            }
        });

    let result = match call_timeout {
        Some(limit) => match tokio::time::timeout(limit, invocation).await {
            Ok(result) => result,
            Err(_) => Err(ToolError::timeout(&name)),
        },
        None => invocation.await,
    };

    match &result {
        Ok(_) => debug!(request_id = id, tool = %name, "Tool call succeeded"),
        Err(e) => debug!(request_id = id, tool = %name, error = %e, "Tool call failed"),
    }

    respond_with(&writer, id, &ToolOutcome::from(result)).await;
}

async fn respond_with<T: Serialize>(writer: &ChannelWriter, id: u64, result: &T) {
    let response = match serde_json::to_value(result) {
        Ok(value) => JsonRpcResponse::success(id, value),
        Err(e) => JsonRpcResponse::failure(
            Some(id),
            RpcError::new(super::protocol::error_codes::INVALID_REQUEST, e.to_string()),
        ),
    };
    respond(writer, response).await;
}

async fn respond(writer: &ChannelWriter, response: JsonRpcResponse) {
    match serde_json::to_value(&response) {
        Ok(value) => send_value(writer, value).await,
        Err(e) => warn!(error = %e, "Failed to encode response"),
    }
}

async fn send_value(writer: &ChannelWriter, value: Value) {
    if let Err(e) = writer.send(&value).await {
        warn!(error = %e, "Failed to send response");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rpc::channel::ChannelReader;
    use crate::rpc::framing::DEFAULT_MAX_FRAME_BYTES;
    use calagent_domain::{FieldSpec, ToolSchema, ValueType};
    use serde_json::{Map, json};
    use tokio::task::JoinHandle;

    fn test_registry() -> ToolRegistry {
        let mut registry = ToolRegistry::new();
        registry
            .register(
                ToolSchema::new("echo", "Echo text")
                    .with_input(FieldSpec::required("text", ValueType::String))
                    .with_output(ValueType::String),
                |args: Map<String, Value>| async move {
                    Ok::<_, ToolError>(args.get("text").cloned().unwrap_or(Value::Null))
                },
            )
            .unwrap();
        registry
            .register(
                ToolSchema::new("sleep", "Sleep then echo")
                    .with_input(FieldSpec::required("ms", ValueType::Integer))
                    .with_output(ValueType::Integer),
                |args: Map<String, Value>| async move {
                    let ms = args.get("ms").and_then(Value::as_u64).unwrap_or(0);
                    tokio::time::sleep(Duration::from_millis(ms)).await;
                    Ok::<_, ToolError>(json!(ms))
                },
            )
            .unwrap();
        registry
            .register(
                ToolSchema::new("crash", "Always panics").with_output(ValueType::String),
                |_args: Map<String, Value>| async move {
                    if true {
                        panic!("handler bug");
                    }
                    Ok::<_, ToolError>(Value::Null)
                },
            )
            .unwrap();
        registry
    }

    struct Peer {
        reader: ChannelReader,
        writer: ChannelWriter,
        server: JoinHandle<Result<EndpointState, ChannelError>>,
    }

    impl Peer {
        fn start(server: ToolServer) -> Self {
            let (agent, provider) = Channel::pair(DEFAULT_MAX_FRAME_BYTES);
            let server = tokio::spawn(async move { server.serve(provider).await });
            let (reader, writer) = agent.split();
            Self {
                reader,
                writer,
                server,
            }
        }

        async fn request(&mut self, id: u64, method: &str, params: Value) -> Value {
            self.send(json!({"jsonrpc": "2.0", "id": id, "method": method, "params": params}))
                .await;
            self.next().await
        }

        async fn send(&self, message: Value) {
            self.writer.send(&message).await.unwrap();
        }

        async fn next(&mut self) -> Value {
            self.reader.receive().await.unwrap().unwrap()
        }
    }

    fn call(name: &str, arguments: Value) -> Value {
        json!({"name": name, "arguments": arguments})
    }

    #[tokio::test]
    async fn test_call_before_discovery_is_rejected() {
        let mut peer = Peer::start(ToolServer::new(Arc::new(test_registry())));

        let resp = peer
            .request(1, methods::TOOLS_CALL, call("echo", json!({"text": "hi"})))
            .await;
        assert_eq!(resp["id"], 1);
        assert_eq!(resp["error"]["code"], -32002);

        // initialize does not unlock tools/call
        let resp = peer.request(2, methods::INITIALIZE, json!({})).await;
        assert_eq!(resp["result"]["protocol_version"], PROTOCOL_VERSION);
        let resp = peer
            .request(3, methods::TOOLS_CALL, call("echo", json!({"text": "hi"})))
            .await;
        assert_eq!(resp["error"]["code"], -32002);
    }

    #[tokio::test]
    async fn test_discovery_is_idempotent() {
        let mut peer = Peer::start(ToolServer::new(Arc::new(test_registry())));

        let first = peer.request(1, methods::TOOLS_LIST, Value::Null).await;
        let second = peer.request(2, methods::TOOLS_LIST, Value::Null).await;
        assert_eq!(first["result"], second["result"]);

        let names: Vec<_> = first["result"]["tools"]
            .as_array()
            .unwrap()
            .iter()
            .map(|t| t["name"].as_str().unwrap().to_string())
            .collect();
        assert_eq!(names, vec!["crash", "echo", "sleep"]);
    }

    #[tokio::test]
    async fn test_tool_failures_are_outcomes() {
        let mut peer = Peer::start(ToolServer::new(Arc::new(test_registry())));
        peer.request(1, methods::TOOLS_LIST, Value::Null).await;

        let ok = peer
            .request(2, methods::TOOLS_CALL, call("echo", json!({"text": "hi"})))
            .await;
        assert_eq!(ok["result"], json!({"outcome": "success", "value": "hi"}));

        let invalid = peer
            .request(3, methods::TOOLS_CALL, call("echo", json!({"text": 5})))
            .await;
        assert_eq!(invalid["result"]["outcome"], "failure");
        assert_eq!(invalid["result"]["kind"], "validation");

        let unknown = peer
            .request(4, methods::TOOLS_CALL, call("nope", json!({})))
            .await;
        assert_eq!(unknown["result"]["kind"], "unknown_tool");
    }

    #[tokio::test]
    async fn test_protocol_errors_keep_channel_open() {
        let mut peer = Peer::start(ToolServer::new(Arc::new(test_registry())));

        let resp = peer.request(1, "calendar/sync", json!({})).await;
        assert_eq!(resp["error"]["code"], -32601);

        peer.send(json!({"jsonrpc": "2.0", "result": 1})).await;
        let resp = peer.next().await;
        assert_eq!(resp["error"]["code"], -32600);
        assert!(resp["id"].is_null());

        peer.request(2, methods::TOOLS_LIST, Value::Null).await;
        let resp = peer.request(3, methods::TOOLS_CALL, json!("not an object")).await;
        assert_eq!(resp["error"]["code"], -32602);

        let resp = peer
            .request(4, methods::TOOLS_CALL, call("echo", json!({"text": "still here"})))
            .await;
        assert_eq!(resp["result"]["value"], "still here");
    }

    #[tokio::test]
    async fn test_non_integer_request_id_gets_invalid_request() {
        let mut peer = Peer::start(ToolServer::new(Arc::new(test_registry())));

        peer.send(json!({"jsonrpc": "2.0", "id": "abc", "method": "tools/list"}))
            .await;
        let resp = tokio::time::timeout(Duration::from_secs(1), peer.next())
            .await
            .expect("a reply to a string id");
        assert_eq!(resp["id"], "abc");
        assert_eq!(resp["error"]["code"], -32600);

        peer.send(json!({"jsonrpc": "2.0", "id": -4, "method": "tools/list"}))
            .await;
        let resp = peer.next().await;
        assert_eq!(resp["id"], -4);
        assert_eq!(resp["error"]["code"], -32600);

        // Not mistaken for discovery
        let resp = peer
            .request(1, methods::TOOLS_CALL, call("echo", json!({"text": "hi"})))
            .await;
        assert_eq!(resp["error"]["code"], -32002);
    }

    #[tokio::test]
    async fn test_panicking_handler_still_answers() {
        let mut peer = Peer::start(ToolServer::new(Arc::new(test_registry())));
        peer.request(1, methods::TOOLS_LIST, Value::Null).await;

        let resp = tokio::time::timeout(
            Duration::from_secs(1),
            peer.request(2, methods::TOOLS_CALL, call("crash", json!({}))),
        )
        .await
        .expect("an outcome for the panicking call");
        assert_eq!(resp["id"], 2);
        assert_eq!(resp["result"]["outcome"], "failure");
        assert_eq!(resp["result"]["kind"], "handler");

        let resp = peer
            .request(3, methods::TOOLS_CALL, call("echo", json!({"text": "alive"})))
            .await;
        assert_eq!(resp["result"]["value"], "alive");
    }

    #[tokio::test]
    async fn test_pipelined_calls_answer_by_id() {
        let mut peer = Peer::start(ToolServer::new(Arc::new(test_registry())));
        peer.request(1, methods::TOOLS_LIST, Value::Null).await;

        peer.send(json!({"jsonrpc": "2.0", "id": 10, "method": "tools/call",
            "params": call("sleep", json!({"ms": 200}))}))
            .await;
        peer.send(json!({"jsonrpc": "2.0", "id": 11, "method": "tools/call",
            "params": call("echo", json!({"text": "fast"}))}))
            .await;

        let first = peer.next().await;
        let second = peer.next().await;
        assert_eq!(first["id"], 11);
        assert_eq!(first["result"]["value"], "fast");
        assert_eq!(second["id"], 10);
        assert_eq!(second["result"]["value"], 200);
    }

    #[tokio::test]
    async fn test_call_timeout_becomes_timeout_outcome() {
        let server = ToolServer::new(Arc::new(test_registry()))
            .with_call_timeout(Duration::from_millis(20));
        let mut peer = Peer::start(server);
        peer.request(1, methods::TOOLS_LIST, Value::Null).await;

        let resp = peer
            .request(2, methods::TOOLS_CALL, call("sleep", json!({"ms": 5_000})))
            .await;
        assert_eq!(resp["result"]["kind"], "timeout");
    }

    #[tokio::test]
    async fn test_shutdown_waits_for_calls_then_closes() {
        let mut peer = Peer::start(ToolServer::new(Arc::new(test_registry())));
        peer.request(1, methods::TOOLS_LIST, Value::Null).await;

        peer.send(json!({"jsonrpc": "2.0", "id": 2, "method": "tools/call",
            "params": call("sleep", json!({"ms": 50}))}))
            .await;
        peer.send(json!({"jsonrpc": "2.0", "id": 3, "method": "shutdown"}))
            .await;

        assert_eq!(peer.next().await["id"], 2);
        let shutdown = peer.next().await;
        assert_eq!(shutdown["id"], 3);
        assert!(shutdown["result"].is_null());
        assert!(shutdown.get("error").is_none());

        assert_eq!(peer.reader.receive().await.unwrap(), None);
        assert_eq!(peer.server.await.unwrap().unwrap(), EndpointState::Closed);
    }

    #[tokio::test]
    async fn test_peer_close_ends_serving() {
        let peer = Peer::start(ToolServer::new(Arc::new(test_registry())));
        peer.writer.close().await;
        assert_eq!(peer.server.await.unwrap().unwrap(), EndpointState::Closed);
    }
}
