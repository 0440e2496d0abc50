//! Structured tool schemas.
//!
//! A [`ToolSchema`] is the published contract of a single tool: an ordered
//! list of typed input fields ([`FieldSpec`]) and the [`ValueType`] of the
//! value it returns. Schemas travel over the wire during discovery, so every
//! type here is plain serde data.
//!
//! ```text
//! ToolSchema "create_event"
//!   input:  summary: string (required)
//!           description: string (optional)
//!           start: datetime (required)
//!           end: datetime (required)
//!   output: record { id, summary, description, start, end }
//! ```

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use thiserror::Error;

/// Type of a single value in a tool's input or output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ValueType {
    String,
    /// ISO-8601 timestamp carried as a JSON string.
    DateTime,
    Integer,
    Number,
    Boolean,
    /// JSON object with a fixed, ordered set of fields.
    Record { fields: Vec<FieldSpec> },
    /// Homogeneous JSON array.
    List { items: Box<ValueType> },
    Null,
}

impl ValueType {
    /// Build a record type from its fields.
    pub fn record(fields: Vec<FieldSpec>) -> Self {
        ValueType::Record { fields }
    }

    /// Build a list type from its element type.
    pub fn list(items: ValueType) -> Self {
        ValueType::List {
            items: Box::new(items),
        }
    }

    /// Short name used in error messages and JSON Schema rendering.
    pub fn as_str(&self) -> &'static str {
        match self {
            ValueType::String => "string",
            ValueType::DateTime => "datetime",
            ValueType::Integer => "integer",
            ValueType::Number => "number",
            ValueType::Boolean => "boolean",
            ValueType::Record { .. } => "record",
            ValueType::List { .. } => "list",
            ValueType::Null => "null",
        }
    }
}

impl std::fmt::Display for ValueType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A named, typed field with an optionality flag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldSpec {
    pub name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
    #[serde(flatten)]
    pub value_type: ValueType,
    pub required: bool,
}

impl FieldSpec {
    /// A field that must be present.
    pub fn required(name: impl Into<String>, value_type: ValueType) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            value_type,
            required: true,
        }
    }

    /// A field that may be omitted or `null`.
    pub fn optional(name: impl Into<String>, value_type: ValueType) -> Self {
        Self {
            required: false,
            ..Self::required(name, value_type)
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }
}

/// Published contract of one tool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolSchema {
    /// Unique name within a provider (e.g. "create_event")
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// Ordered input fields
    pub input: Vec<FieldSpec>,
    /// Type of the success value
    pub output: ValueType,
}

impl ToolSchema {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            input: Vec::new(),
            output: ValueType::Null,
        }
    }

    pub fn with_input(mut self, field: FieldSpec) -> Self {
        self.input.push(field);
        self
    }

    pub fn with_output(mut self, output: ValueType) -> Self {
        self.output = output;
        self
    }

    /// Look up an input field by name.
    pub fn input_field(&self, name: &str) -> Option<&FieldSpec> {
        self.input.iter().find(|f| f.name == name)
    }

    /// Check that the schema itself is well formed.
    ///
    /// Tool names must be non-empty identifiers and field names must be
    /// unique within every record, including nested ones.
    pub fn check(&self) -> Result<(), SchemaError> {
        if self.name.trim().is_empty() {
            return Err(SchemaError::EmptyToolName);
        }
        if !self
            .name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-' || c == '.')
        {
            return Err(SchemaError::InvalidToolName(self.name.clone()));
        }
        check_fields(&self.name, &self.input)?;
        check_type(&self.name, &self.output)
    }
}

fn check_fields(tool: &str, fields: &[FieldSpec]) -> Result<(), SchemaError> {
    let mut seen = HashSet::new();
    for field in fields {
        if field.name.is_empty() {
            return Err(SchemaError::EmptyFieldName {
                tool: tool.to_string(),
            });
        }
        if !seen.insert(field.name.as_str()) {
            return Err(SchemaError::DuplicateField {
                tool: tool.to_string(),
                field: field.name.clone(),
            });
        }
        check_type(tool, &field.value_type)?;
    }
    Ok(())
}

fn check_type(tool: &str, value_type: &ValueType) -> Result<(), SchemaError> {
    match value_type {
        ValueType::Record { fields } => check_fields(tool, fields),
        ValueType::List { items } => check_type(tool, items),
        _ => Ok(()),
    }
}

/// A schema that cannot be published.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaError {
    #[error("tool name cannot be empty")]
    EmptyToolName,

    #[error("invalid tool name '{0}'")]
    InvalidToolName(String),

    #[error("tool '{tool}' has a field with an empty name")]
    EmptyFieldName { tool: String },

    #[error("tool '{tool}' declares field '{field}' more than once")]
    DuplicateField { tool: String, field: String },

    #[error("tool '{0}' is listed more than once")]
    DuplicateTool(String),
}

/// Parse an ISO-8601 timestamp into UTC.
///
/// Accepts RFC 3339 (`2025-01-06T09:00:00Z`, `2025-01-06T10:00:00+01:00`)
/// and offset-less local forms (`2025-01-06T09:00:00`), which are read as UTC.
pub fn parse_datetime(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.with_timezone(&Utc));
    }
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(value, fmt).ok())
        .map(|naive| naive.and_utc())
}
