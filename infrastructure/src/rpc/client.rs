//! Tool Client Proxy
//!
//! [`ToolClient`] runs in the agent process. It discovers the provider's
//! tools once at session start, checks arguments against the published
//! schemas locally, and turns each call into a `tools/call` request.
//!
//! # Architecture
//!
//! ```text
//! call_tool() ─┐                      ┌─ reader task ◀── provider stdout
//! call_tool() ─┼─▶ ChannelWriter ──▶  │   │
//! call_tool() ─┘   (serialized)       │   └─ pending[id].send(response)
//!      ▲                              │
//!      └──── oneshot::Receiver ◀──────┘
//! ```
//!
//! Request ids come from a per-client counter, so concurrent calls never
//! share an id. The background reader owns the read half and completes the
//! waiter registered under the response's id. When the channel ends every
//! outstanding waiter fails with [`ClientError::ChannelClosed`].

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use calagent_application::ports::tool_executor::ToolExecutorPort;
use calagent_domain::{
    SchemaValidator, ToolCall, ToolError, ToolOutcome, ToolSchema, ToolSpec, ToolValidator,
};
use serde_json::{Map, Value, json};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::channel::{Channel, ChannelReader, ChannelWriter};
use super::error::ClientError;
use super::process::ProviderProcess;
use super::protocol::{
    InitializeResult, JsonRpcRequest, JsonRpcResponse, ToolCallParams, ToolsListResult, methods,
};
use super::transport::{MessageKind, classify_message};

type PendingMap = Arc<Mutex<PendingTable>>;

#[derive(Default)]
struct PendingTable {
    waiters: HashMap<u64, oneshot::Sender<JsonRpcResponse>>,
    closed: bool,
}

fn lock(pending: &PendingMap) -> std::sync::MutexGuard<'_, PendingTable> {
    pending.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Removes the waiter when the request is abandoned (timeout, send error,
/// or the caller's future being dropped).
struct PendingGuard<'a> {
    pending: &'a PendingMap,
    id: u64,
}

impl Drop for PendingGuard<'_> {
    fn drop(&mut self) {
        lock(self.pending).waiters.remove(&self.id);
    }
}

#[derive(Debug, Clone)]
pub struct ClientOptions {
    pub discovery_timeout: Duration,
    pub call_timeout: Duration,
    pub shutdown_timeout: Duration,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            discovery_timeout: Duration::from_secs(10),
            call_timeout: Duration::from_secs(30),
            shutdown_timeout: Duration::from_secs(2),
        }
    }
}

pub struct ToolClient {
    writer: Arc<ChannelWriter>,
    pending: PendingMap,
    next_id: AtomicU64,
    spec: ToolSpec,
    server: Option<InitializeResult>,
    options: ClientOptions,
    validator: SchemaValidator,
    reader_task: JoinHandle<()>,
    process: tokio::sync::Mutex<Option<ProviderProcess>>,
    shut_down: AtomicBool,
}

impl ToolClient {
    /// Wrap a channel. No tools are known until [`discover`](Self::discover).
    pub fn new(channel: Channel, options: ClientOptions) -> Self {
        let (reader, writer) = channel.split();
        let pending: PendingMap = Arc::new(Mutex::new(PendingTable::default()));
        let reader_task = tokio::spawn(reader_loop(reader, pending.clone()));

        Self {
            writer: Arc::new(writer),
            pending,
            next_id: AtomicU64::new(1),
            spec: ToolSpec::new(),
            server: None,
            options,
            validator: SchemaValidator,
            reader_task,
            process: tokio::sync::Mutex::new(None),
            shut_down: AtomicBool::new(false),
        }
    }

    /// Attach the provider process so shutdown also reaps it.
    pub fn with_process(mut self, process: ProviderProcess) -> Self {
        self.process = tokio::sync::Mutex::new(Some(process));
        self
    }

    /// Wrap a channel and discover its tools.
    pub async fn connect(channel: Channel, options: ClientOptions) -> Result<Self, ClientError> {
        let mut client = Self::new(channel, options);
        client.discover().await?;
        Ok(client)
    }

    /// Spawn a provider process, connect to its stdio and discover its tools.
    pub async fn spawn(
        command: &str,
        args: &[String],
        env: &HashMap<String, String>,
        max_frame_bytes: usize,
        options: ClientOptions,
    ) -> Result<Self, ClientError> {
        let (process, channel) = ProviderProcess::spawn(command, args, env, max_frame_bytes)?;
        let mut client = Self::new(channel, options).with_process(process);
        if let Err(e) = client.discover().await {
            client.shutdown().await;
            return Err(e);
        }
        Ok(client)
    }

    /// Run `initialize` then `tools/list`.
    ///
    /// On any failure the client is left with an empty tool set, even if an
    /// earlier discovery succeeded, and the error is returned as
    /// [`ClientError::Discovery`].
    pub async fn discover(&mut self) -> Result<(), ClientError> {
        self.spec = ToolSpec::new();
        self.server = None;
        let timeout = self.options.discovery_timeout;
        let discovery = |e: ClientError| ClientError::Discovery(e.to_string());

        let init = self
            .request(
                methods::INITIALIZE,
                Some(json!({
                    "client": env!("CARGO_PKG_NAME"),
                    "version": env!("CARGO_PKG_VERSION"),
                })),
                timeout,
            )
            .await
            .map_err(discovery)?;
        let server: InitializeResult = serde_json::from_value(init)
            .map_err(|e| ClientError::Discovery(format!("bad initialize result: {}", e)))?;

        let list = self
            .request(methods::TOOLS_LIST, None, timeout)
            .await
            .map_err(discovery)?;
        let list: ToolsListResult = serde_json::from_value(list)
            .map_err(|e| ClientError::Discovery(format!("bad tools/list result: {}", e)))?;
        let spec = ToolSpec::from_schemas(list.tools)
            .map_err(|e| ClientError::Discovery(format!("provider published {}", e)))?;

        info!(
            provider = %server.name,
            version = %server.version,
            tools = spec.len(),
            "Discovered tools"
        );
        self.spec = spec;
        self.server = Some(server);
        Ok(())
    }

    pub fn server_info(&self) -> Option<&InitializeResult> {
        self.server.as_ref()
    }

    pub fn spec(&self) -> &ToolSpec {
        &self.spec
    }

    pub fn is_closed(&self) -> bool {
        lock(&self.pending).closed
    }

    /// One callable per discovered tool, carrying the same schema.
    pub fn tools(self: &Arc<Self>) -> Vec<RemoteTool> {
        self.spec
            .all()
            .map(|schema| RemoteTool {
                client: Arc::clone(self),
                schema: schema.clone(),
            })
            .collect()
    }

    /// Call a discovered tool.
    ///
    /// Arguments are validated before anything is sent. Tool-level failures
    /// come back as [`ToolOutcome::Failure`]; `Err` means the call did not
    /// complete (validation, timeout, channel).
    pub async fn call_tool(
        &self,
        name: &str,
        arguments: Map<String, Value>,
    ) -> Result<ToolOutcome, ClientError> {
        if self.is_closed() {
            return Err(ClientError::ChannelClosed);
        }
        let schema = self
            .spec
            .get(name)
            .ok_or_else(|| ClientError::UnknownTool(name.to_string()))?;
        self.validator.validate_arguments(schema, &arguments)?;

        let params = serde_json::to_value(ToolCallParams {
            name: name.to_string(),
            arguments,
        })
        .map_err(|e| ClientError::UnexpectedResponse(e.to_string()))?;

        let result = self
            .request(methods::TOOLS_CALL, Some(params), self.options.call_timeout)
            .await?;
        serde_json::from_value(result)
            .map_err(|e| ClientError::UnexpectedResponse(format!("bad tools/call result: {}", e)))
    }

    async fn request(
        &self,
        method: &str,
        params: Option<Value>,
        timeout: Duration,
    ) -> Result<Value, ClientError> {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let (tx, rx) = oneshot::channel();
        {
            let mut table = lock(&self.pending);
            if table.closed {
                return Err(ClientError::ChannelClosed);
            }
            table.waiters.insert(id, tx);
        }
        let _guard = PendingGuard {
            pending: &self.pending,
            id,
        };

        let request = serde_json::to_value(JsonRpcRequest::new(id, method, params))
            .map_err(|e| ClientError::UnexpectedResponse(e.to_string()))?;
        debug!(request_id = id, method = %method, "Sending request");
        self.writer.send(&request).await?;

        match tokio::time::timeout(timeout, rx).await {
            Ok(Ok(response)) => response.into_result().map_err(|e| ClientError::Rpc {
                code: e.code,
                message: e.message,
            }),
            Ok(Err(_)) => Err(ClientError::ChannelClosed),
            Err(_) => {
                warn!(request_id = id, method = %method, "Request timed out");
                Err(ClientError::Timeout {
                    method: method.to_string(),
                    after: timeout,
                })
            }
        }
    }

    /// Send `shutdown`, close the channel and reap the provider.
    ///
    /// Safe to call more than once.
    pub async fn shutdown(&self) {
        if self.shut_down.swap(true, Ordering::SeqCst) {
            return;
        }
        if !self.is_closed() {
            match self
                .request(methods::SHUTDOWN, None, self.options.shutdown_timeout)
                .await
            {
                Ok(_) => debug!("Provider acknowledged shutdown"),
                Err(e) => debug!(error = %e, "Provider did not acknowledge shutdown"),
            }
        }
        self.writer.close().await;
        close_pending(&self.pending);

        if let Some(mut process) = self.process.lock().await.take() {
            process.terminate().await;
        }
        self.reader_task.abort();
    }
}

impl Drop for ToolClient {
    fn drop(&mut self) {
        self.reader_task.abort();
    }
}

fn close_pending(pending: &PendingMap) {
    let mut table = lock(pending);
    table.closed = true;
    // Dropping the senders wakes every waiter with RecvError
    table.waiters.clear();
}

async fn reader_loop(mut reader: ChannelReader, pending: PendingMap) {
    loop {
        let message = match reader.receive().await {
            Ok(Some(message)) => message,
            Ok(None) => {
                debug!("Provider closed the channel");
                break;
            }
            Err(e) if e.is_recoverable() => {
                warn!(error = %e, "Skipping malformed message from provider");
                continue;
            }
            Err(e) => {
                warn!(error = %e, "Channel to provider failed");
                break;
            }
        };

        match classify_message(&message) {
            MessageKind::Response { id } => {
                let response: JsonRpcResponse = match serde_json::from_value(message) {
                    Ok(response) => response,
                    Err(e) => {
                        warn!(request_id = id, error = %e, "Invalid response");
                        continue;
                    }
                };
                let waiter = lock(&pending).waiters.remove(&id);
                match waiter {
                    Some(tx) => {
                        let _ = tx.send(response);
                    }
                    None => debug!(request_id = id, "Dropping response with no waiter"),
                }
            }
            MessageKind::Request { id, method } => {
                debug!(request_id = id, method = %method, "Ignoring request from provider");
            }
            MessageKind::Notification { method } | MessageKind::UnsupportedId { method, .. } => {
                debug!(method = %method, "Ignoring message from provider");
            }
            MessageKind::Invalid => match message.get("error") {
                Some(error) => warn!(error = %error, "Provider reported a protocol error"),
                None => debug!("Ignoring message without id or method"),
            },
        }
    }
    close_pending(&pending);
}

#[async_trait]
impl ToolExecutorPort for ToolClient {
    fn tool_spec(&self) -> &ToolSpec {
        &self.spec
    }

    async fn execute(&self, call: &ToolCall) -> Result<Value, ToolError> {
        match self.call_tool(&call.tool_name, call.arguments.clone()).await {
            Ok(ToolOutcome::Success { value }) => Ok(value),
            Ok(ToolOutcome::Failure(error)) => Err(error),
            Err(e) => Err(e.into()),
        }
    }

    async fn close(&self) {
        self.shutdown().await;
    }
}

/// A discovered tool bound to its client.
#[derive(Clone)]
pub struct RemoteTool {
    client: Arc<ToolClient>,
    schema: ToolSchema,
}

impl RemoteTool {
    pub fn name(&self) -> &str {
        &self.schema.name
    }

    pub fn schema(&self) -> &ToolSchema {
        &self.schema
    }

    pub async fn call(&self, arguments: Map<String, Value>) -> Result<ToolOutcome, ClientError> {
        self.client.call_tool(&self.schema.name, arguments).await
    }
}
