//! JSON-RPC protocol types for the tool channel.
//!
//! # Protocol Overview
//!
//! - `initialize`: agent → provider, returns [`InitializeResult`]
//! - `tools/list`: returns [`ToolsListResult`], sorted by tool name
//! - `tools/call`: [`ToolCallParams`] in, a `ToolOutcome` out
//! - `shutdown`: returns `null`, then the provider stops serving
//!
//! Tool failures travel inside the `tools/call` result. The JSON-RPC `error`
//! member is reserved for protocol problems (see [`error_codes`]).

use calagent_domain::ToolSchema;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub const PROTOCOL_VERSION: &str = "2024-11-05";

pub mod methods {
    pub const INITIALIZE: &str = "initialize";
    pub const TOOLS_LIST: &str = "tools/list";
    pub const TOOLS_CALL: &str = "tools/call";
    pub const SHUTDOWN: &str = "shutdown";
}

pub mod error_codes {
    pub const PARSE_ERROR: i64 = -32700;
    pub const INVALID_REQUEST: i64 = -32600;
    pub const METHOD_NOT_FOUND: i64 = -32601;
    pub const INVALID_PARAMS: i64 = -32602;
    /// `tools/call` received before `tools/list`.
    pub const NOT_DISCOVERED: i64 = -32002;
}

/// JSON-RPC request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcRequest {
    pub jsonrpc: String,
    pub id: u64,
    pub method: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
}

impl JsonRpcRequest {
    pub fn new(id: u64, method: impl Into<String>, params: Option<Value>) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            id,
            method: method.into(),
            params,
        }
    }
}

/// JSON-RPC response
///
/// `id` is `None` only for parse errors, where the request id is unknown.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcResponse {
    pub jsonrpc: String,
    pub id: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<RpcError>,
}

impl JsonRpcResponse {
    pub fn success(id: u64, result: Value) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            id: Some(id),
            result: Some(result),
            error: None,
        }
    }

    pub fn failure(id: Option<u64>, error: RpcError) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            id,
            result: None,
            error: Some(error),
        }
    }

    /// Split into the result value or the error object.
    ///
    /// A `null` result deserializes as `None`, so a response without an
    /// error member yields `Value::Null`.
    pub fn into_result(self) -> Result<Value, RpcError> {
        match self.error {
            Some(error) => Err(error),
            None => Ok(self.result.unwrap_or(Value::Null)),
        }
    }
}

/// JSON-RPC error object
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RpcError {
    pub code: i64,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl RpcError {
    pub fn new(code: i64, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            data: None,
        }
    }

    pub fn parse_error(detail: impl std::fmt::Display) -> Self {
        Self::new(error_codes::PARSE_ERROR, format!("Parse error: {}", detail))
    }

    pub fn invalid_request(detail: impl Into<String>) -> Self {
        Self::new(error_codes::INVALID_REQUEST, detail)
    }

    pub fn method_not_found(method: &str) -> Self {
        Self::new(
            error_codes::METHOD_NOT_FOUND,
            format!("Method not found: {}", method),
        )
    }

    pub fn invalid_params(detail: impl std::fmt::Display) -> Self {
        Self::new(
            error_codes::INVALID_PARAMS,
            format!("Invalid params: {}", detail),
        )
    }

    pub fn not_discovered() -> Self {
        Self::new(
            error_codes::NOT_DISCOVERED,
            "tools/call before tools/list",
        )
    }
}

/// Result of `initialize`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InitializeResult {
    pub name: String,
    pub version: String,
    pub protocol_version: String,
}

/// Result of `tools/list`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolsListResult {
    pub tools: Vec<ToolSchema>,
}

/// Parameters of `tools/call`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCallParams {
    pub name: String,
    #[serde(default)]
    pub arguments: Map<String, Value>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_request_omits_missing_params() {
        let req = JsonRpcRequest::new(7, methods::TOOLS_LIST, None);
        let json = serde_json::to_value(&req).unwrap();
        assert_eq!(
            json,
            json!({"jsonrpc": "2.0", "id": 7, "method": "tools/list"})
        );
    }

    #[test]
    fn test_null_result_is_success() {
        let resp: JsonRpcResponse =
            serde_json::from_value(json!({"jsonrpc": "2.0", "id": 4, "result": null})).unwrap();
        assert_eq!(resp.into_result().unwrap(), Value::Null);
    }

    #[test]
    fn test_error_response() {
        let resp = JsonRpcResponse::failure(Some(2), RpcError::not_discovered());
        let json = serde_json::to_value(&resp).unwrap();
        assert_eq!(json["error"]["code"], -32002);
        assert!(json.get("result").is_none());

        let back: JsonRpcResponse = serde_json::from_value(json).unwrap();
        assert_eq!(back.into_result().unwrap_err().code, error_codes::NOT_DISCOVERED);
    }

    #[test]
    fn test_tool_call_params_default_arguments() {
        let params: ToolCallParams =
            serde_json::from_value(json!({"name": "get_events"})).unwrap();
        assert_eq!(params.name, "get_events");
        assert!(params.arguments.is_empty());
    }
}
