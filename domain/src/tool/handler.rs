//! Tool handler abstraction
//!
//! A handler is the async function behind a registered tool. It receives
//! arguments that already passed schema validation and returns the success
//! value or a [`ToolError`].

use super::value_objects::ToolError;
use async_trait::async_trait;
use serde_json::{Map, Value};
use std::future::Future;

#[async_trait]
pub trait ToolHandler: Send + Sync {
    async fn call(&self, arguments: Map<String, Value>) -> Result<Value, ToolError>;
}

#[async_trait]
impl<F, Fut> ToolHandler for F
where
    F: Send + Sync + Fn(Map<String, Value>) -> Fut,
    Fut: Future<Output = Result<Value, ToolError>> + Send,
{
    async fn call(&self, arguments: Map<String, Value>) -> Result<Value, ToolError> {
        (self)(arguments).await
    }
}
