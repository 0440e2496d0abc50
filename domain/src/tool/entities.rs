//! Tool domain entities

use super::schema::{SchemaError, ToolSchema};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Catalog of tool schemas, keyed by name.
///
/// Built from a provider's discovery response or a registry snapshot.
/// Iteration is in name order so prompts and listings are stable.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ToolSpec {
    tools: BTreeMap<String, ToolSchema>,
}

impl ToolSpec {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a catalog from published schemas.
    ///
    /// Every schema must be well formed and names must be unique; a catalog
    /// is never partially built.
    pub fn from_schemas(schemas: impl IntoIterator<Item = ToolSchema>) -> Result<Self, SchemaError> {
        let mut spec = Self::new();
        for schema in schemas {
            spec.insert(schema)?;
        }
        Ok(spec)
    }

    /// Add one schema, rejecting malformed schemas and taken names.
    pub fn insert(&mut self, schema: ToolSchema) -> Result<(), SchemaError> {
        schema.check()?;
        if self.tools.contains_key(&schema.name) {
            return Err(SchemaError::DuplicateTool(schema.name));
        }
        self.tools.insert(schema.name.clone(), schema);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&ToolSchema> {
        self.tools.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    pub fn all(&self) -> impl Iterator<Item = &ToolSchema> {
        self.tools.values()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.tools.keys().map(|s| s.as_str())
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Owned copy of every schema in name order.
    pub fn schemas(&self) -> Vec<ToolSchema> {
        self.tools.values().cloned().collect()
    }
}

/// A call to a tool with arguments
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    /// Identifier linking the call to its result turn
    #[serde(default)]
    pub call_id: String,
    /// Name of the tool to call
    pub tool_name: String,
    /// Arguments passed to the tool
    #[serde(default)]
    pub arguments: Map<String, Value>,
}

impl ToolCall {
    pub fn new(tool_name: impl Into<String>) -> Self {
        Self {
            call_id: String::new(),
            tool_name: tool_name.into(),
            arguments: Map::new(),
        }
    }

    pub fn with_call_id(mut self, call_id: impl Into<String>) -> Self {
        self.call_id = call_id.into();
        self
    }

    pub fn with_arg(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.arguments.insert(key.into(), value.into());
        self
    }

    pub fn with_arguments(mut self, arguments: Map<String, Value>) -> Self {
        self.arguments = arguments;
        self
    }

    /// Get a string argument
    pub fn get_string(&self, key: &str) -> Option<&str> {
        self.arguments.get(key).and_then(|v| v.as_str())
    }

    /// Get a required string argument or return an error message
    pub fn require_string(&self, key: &str) -> Result<&str, String> {
        self.get_string(key)
            .ok_or_else(|| format!("Missing required argument: {}", key))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tool::schema::{FieldSpec, ValueType};

    fn schema(name: &str) -> ToolSchema {
        ToolSchema::new(name, "test tool")
            .with_input(FieldSpec::required("id", ValueType::String))
    }

    #[test]
    fn test_tool_spec_orders_by_name() {
        let spec =
            ToolSpec::from_schemas([schema("get_events"), schema("create_event"), schema("delete_event")])
                .unwrap();

        assert_eq!(spec.len(), 3);
        assert_eq!(
            spec.names().collect::<Vec<_>>(),
            vec!["create_event", "delete_event", "get_events"]
        );
        assert!(spec.get("create_event").is_some());
        assert!(spec.get("unknown").is_none());
    }

    #[test]
    fn test_tool_spec_rejects_duplicates() {
        let result = ToolSpec::from_schemas([schema("a"), schema("a")]);
        assert_eq!(result, Err(SchemaError::DuplicateTool("a".into())));
    }

    #[test]
    fn test_tool_spec_rejects_malformed_schema() {
        let result = ToolSpec::from_schemas([schema("ok"), schema("")]);
        assert_eq!(result, Err(SchemaError::EmptyToolName));
    }

    #[test]
    fn test_tool_call() {
        let call = ToolCall::new("delete_event")
            .with_call_id("call_1")
            .with_arg("id", "E1");

        assert_eq!(call.tool_name, "delete_event");
        assert_eq!(call.call_id, "call_1");
        assert_eq!(call.get_string("id"), Some("E1"));
        assert_eq!(call.require_string("id").unwrap(), "E1");
        assert!(call.require_string("missing").is_err());
    }
}
