//! Tool domain traits
//!
//! Structural validation of tool arguments and outputs against a
//! [`ToolSchema`]. Both sides of the process boundary run the same checks:
//! the client proxy before sending a request, the registry before calling a
//! handler.

use super::schema::{FieldSpec, ToolSchema, ValueType, parse_datetime};
use serde_json::{Map, Value};
use std::collections::HashSet;
use thiserror::Error;

/// Why a value does not satisfy a schema.
///
/// `field` is a dotted path into the value (`start`, `items[2].id`).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("missing required field '{field}'")]
    MissingField { field: String },

    #[error("unknown field '{field}'")]
    UnknownField { field: String },

    #[error("field '{field}' expected {expected}, found {found}")]
    TypeMismatch {
        field: String,
        expected: &'static str,
        found: &'static str,
    },

    #[error("field '{field}' is not an ISO-8601 datetime: '{value}'")]
    InvalidDateTime { field: String, value: String },
}

/// Validator for tool arguments and results
pub trait ToolValidator {
    /// Validate call arguments against the tool's input fields.
    fn validate_arguments(
        &self,
        schema: &ToolSchema,
        arguments: &Map<String, Value>,
    ) -> Result<(), ValidationError>;

    /// Validate a handler's success value against the tool's output type.
    fn validate_output(&self, schema: &ToolSchema, value: &Value) -> Result<(), ValidationError>;
}

/// Strict structural validator.
///
/// Rejects missing required fields, fields the schema does not declare, and
/// values whose JSON type does not match. Optional fields may be absent or
/// `null`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SchemaValidator;

impl ToolValidator for SchemaValidator {
    fn validate_arguments(
        &self,
        schema: &ToolSchema,
        arguments: &Map<String, Value>,
    ) -> Result<(), ValidationError> {
        validate_record(&schema.input, arguments, "")
    }

    fn validate_output(&self, schema: &ToolSchema, value: &Value) -> Result<(), ValidationError> {
        validate_value(&schema.output, value, "output")
    }
}

fn join_path(prefix: &str, name: &str) -> String {
    if prefix.is_empty() {
        name.to_string()
    } else {
        format!("{}.{}", prefix, name)
    }
}

fn validate_record(
    fields: &[FieldSpec],
    object: &Map<String, Value>,
    prefix: &str,
) -> Result<(), ValidationError> {
    for field in fields {
        let path = join_path(prefix, &field.name);
        match object.get(&field.name) {
            None | Some(Value::Null) if field.required && field.value_type != ValueType::Null => {
                return Err(ValidationError::MissingField { field: path });
            }
            None | Some(Value::Null) => {}
            Some(value) => validate_value(&field.value_type, value, &path)?,
        }
    }

    let declared: HashSet<&str> = fields.iter().map(|f| f.name.as_str()).collect();
    if let Some(extra) = object.keys().find(|k| !declared.contains(k.as_str())) {
        return Err(ValidationError::UnknownField {
            field: join_path(prefix, extra),
        });
    }

    Ok(())
}

fn validate_value(expected: &ValueType, value: &Value, path: &str) -> Result<(), ValidationError> {
    let mismatch = || ValidationError::TypeMismatch {
        field: path.to_string(),
        expected: expected.as_str(),
        found: json_type_name(value),
    };

    match expected {
        ValueType::String => value.is_string().then_some(()).ok_or_else(mismatch),
        ValueType::DateTime => {
            let text = value.as_str().ok_or_else(mismatch)?;
            parse_datetime(text)
                .map(|_| ())
                .ok_or_else(|| ValidationError::InvalidDateTime {
                    field: path.to_string(),
                    value: text.to_string(),
                })
        }
        ValueType::Integer => (value.is_i64() || value.is_u64())
            .then_some(())
            .ok_or_else(mismatch),
        ValueType::Number => value.is_number().then_some(()).ok_or_else(mismatch),
        ValueType::Boolean => value.is_boolean().then_some(()).ok_or_else(mismatch),
        ValueType::Null => value.is_null().then_some(()).ok_or_else(mismatch),
        ValueType::Record { fields } => {
            let object = value.as_object().ok_or_else(mismatch)?;
            validate_record(fields, object, path)
        }
        ValueType::List { items } => {
            let array = value.as_array().ok_or_else(mismatch)?;
            for (index, item) in array.iter().enumerate() {
                validate_value(items, item, &format!("{}[{}]", path, index))?;
            }
            Ok(())
        }
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(n) if n.is_f64() => "number",
        Value::Number(_) => "integer",
        Value::String(_) => "string",
        Value::Array(_) => "list",
        Value::Object(_) => "record",
    }
}
