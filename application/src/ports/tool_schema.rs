//! Tool schema conversion port.
//!
//! Separates the published [`ToolSchema`] (domain) from the JSON Schema
//! shape a reasoning API expects (infrastructure).

use calagent_domain::ToolSchema;

/// Port for converting tool schemas to a reasoning API's tool format.
pub trait ToolSchemaPort: Send + Sync {
    /// Convert a single tool schema.
    fn tool_to_schema(&self, tool: &ToolSchema) -> serde_json::Value;

    /// Convert every tool, sorted by name.
    fn all_tools_schema(&self, tools: &[ToolSchema]) -> Vec<serde_json::Value> {
        let mut sorted: Vec<&ToolSchema> = tools.iter().collect();
        sorted.sort_by(|a, b| a.name.cmp(&b.name));
        sorted.into_iter().map(|t| self.tool_to_schema(t)).collect()
    }
}
