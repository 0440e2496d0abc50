//! Tool Registry
//!
//! The [`ToolRegistry`] holds the tools a provider exposes: each one a
//! published [`ToolSchema`] paired with an async [`ToolHandler`]. It is pure
//! bookkeeping; handlers do the I/O.
//!
//! # Usage
//!
//! ```ignore
//! let mut registry = ToolRegistry::new();
//! registry.register(
//!     ToolSchema::new("delete_event", "Delete an event")
//!         .with_input(FieldSpec::required("id", ValueType::String)),
//!     |args: Map<String, Value>| async move { Ok(json!({"status": "deleted"})) },
//! )?;
//!
//! let value = registry.invoke("delete_event", args).await?;
//! ```
//!
//! # Invocation
//!
//! `invoke` checks the arguments against the input schema before the
//! handler runs, so a rejected call never reaches the backend. Successful
//! handler output is checked against the output schema as well.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use calagent_application::ports::tool_executor::ToolExecutorPort;
use calagent_domain::{
    SchemaError, SchemaValidator, ToolCall, ToolError, ToolErrorKind, ToolHandler, ToolSchema,
    ToolSpec, ToolValidator, ValidationError,
};
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::debug;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum RegistryError {
    #[error("Tool already registered: {0}")]
    DuplicateName(String),

    #[error("Invalid tool schema: {0}")]
    InvalidSchema(SchemaError),

    #[error("Unknown tool: {0}")]
    UnknownTool(String),

    #[error("Invalid arguments for {tool}: {source}")]
    Validation {
        tool: String,
        #[source]
        source: ValidationError,
    },

    #[error("{tool} failed: {source}")]
    Handler {
        tool: String,
        #[source]
        source: ToolError,
    },

    #[error("{tool} returned a value that does not match its output schema: {source}")]
    InvalidOutput {
        tool: String,
        #[source]
        source: ValidationError,
    },
}

/// Convert a registry failure into the error that travels back to the agent.
///
/// Handler errors keep their own kind (backend, not_found, ...).
pub fn registry_error_to_tool_error(err: RegistryError) -> ToolError {
    match err {
        RegistryError::UnknownTool(name) => ToolError::unknown_tool(name),
        RegistryError::Validation { source, .. } => source.into(),
        RegistryError::Handler { source, .. } => source,
        other @ (RegistryError::InvalidOutput { .. }
        | RegistryError::DuplicateName(_)
        | RegistryError::InvalidSchema(_)) => ToolError::new(ToolErrorKind::Handler, other.to_string()),
    }
}

struct RegisteredTool {
    schema: ToolSchema,
    handler: Arc<dyn ToolHandler>,
}

/// Registered tools keyed by name
pub struct ToolRegistry {
    tools: BTreeMap<String, RegisteredTool>,
    spec: ToolSpec,
    validator: SchemaValidator,
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self {
            tools: BTreeMap::new(),
            spec: ToolSpec::new(),
            validator: SchemaValidator,
        }
    }

    /// Register a tool.
    ///
    /// Fails with [`RegistryError::DuplicateName`] if the name is taken and
    /// with [`RegistryError::InvalidSchema`] if the schema is malformed. On
    /// failure the registry is unchanged.
    pub fn register<H>(&mut self, schema: ToolSchema, handler: H) -> Result<(), RegistryError>
    where
        H: ToolHandler + 'static,
    {
        self.register_arc(schema, Arc::new(handler))
    }

    pub fn register_arc(
        &mut self,
        schema: ToolSchema,
        handler: Arc<dyn ToolHandler>,
    ) -> Result<(), RegistryError> {
        if self.tools.contains_key(&schema.name) {
            return Err(RegistryError::DuplicateName(schema.name));
        }
        self.spec.insert(schema.clone()).map_err(|e| match e {
            SchemaError::DuplicateTool(name) => RegistryError::DuplicateName(name),
            other => RegistryError::InvalidSchema(other),
        })?;

        debug!(tool = %schema.name, "Registered tool");
        self.tools
            .insert(schema.name.clone(), RegisteredTool { schema, handler });
        Ok(())
    }

    /// Snapshot of every schema, sorted by name.
    pub fn list(&self) -> Vec<ToolSchema> {
        self.spec.schemas()
    }

    pub fn get(&self, name: &str) -> Option<&ToolSchema> {
        self.tools.get(name).map(|t| &t.schema)
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Validate `arguments` and run the named handler.
    pub async fn invoke(
        &self,
        name: &str,
        arguments: Map<String, Value>,
    ) -> Result<Value, RegistryError> {
        let tool = self
            .tools
            .get(name)
            .ok_or_else(|| RegistryError::UnknownTool(name.to_string()))?;

        self.validator
            .validate_arguments(&tool.schema, &arguments)
            .map_err(|source| RegistryError::Validation {
                tool: name.to_string(),
                source,
            })?;

        let value = tool
            .handler
            .call(arguments)
            .await
            .map_err(|source| RegistryError::Handler {
                tool: name.to_string(),
                source,
            })?;

        self.validator
            .validate_output(&tool.schema, &value)
            .map_err(|source| RegistryError::InvalidOutput {
                tool: name.to_string(),
                source,
            })?;

        Ok(value)
    }
}

#[async_trait]
impl ToolExecutorPort for ToolRegistry {
    fn tool_spec(&self) -> &ToolSpec {
        &self.spec
    }

    async fn execute(&self, call: &ToolCall) -> Result<Value, ToolError> {
        self.invoke(&call.tool_name, call.arguments.clone())
            .await
            .map_err(registry_error_to_tool_error)
    }
}
