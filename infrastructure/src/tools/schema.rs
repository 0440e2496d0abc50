//! JSON Schema tool converter.
//!
//! Default implementation of [`ToolSchemaPort`] producing OpenAI-style
//! `function` tools for chat-completions APIs.
//!
//! Value types map as follows:
//! - `string` → `"string"`
//! - `datetime` → `"string"` with `"format": "date-time"`
//! - `integer`, `number`, `boolean`, `null` → the same JSON Schema type
//! - `record` → nested `"object"` with `properties` / `required`
//! - `list` → `"array"` with `items`

use calagent_application::ports::tool_schema::ToolSchemaPort;
use calagent_domain::{FieldSpec, ToolSchema, ValueType};
use serde_json::{Map, Value, json};

pub struct JsonSchemaToolConverter;

fn value_schema(value_type: &ValueType) -> Value {
    match value_type {
        ValueType::String => json!({"type": "string"}),
        ValueType::DateTime => json!({"type": "string", "format": "date-time"}),
        ValueType::Integer => json!({"type": "integer"}),
        ValueType::Number => json!({"type": "number"}),
        ValueType::Boolean => json!({"type": "boolean"}),
        ValueType::Null => json!({"type": "null"}),
        ValueType::Record { fields } => object_schema(fields),
        ValueType::List { items } => json!({"type": "array", "items": value_schema(items)}),
    }
}

fn object_schema(fields: &[FieldSpec]) -> Value {
    let mut properties = Map::new();
    let mut required = Vec::new();

    for field in fields {
        let mut prop = value_schema(&field.value_type);
        if let Some(obj) = prop.as_object_mut().filter(|_| !field.description.is_empty()) {
            obj.insert("description".to_string(), json!(field.description));
        }
        properties.insert(field.name.clone(), prop);

        if field.required {
            required.push(json!(field.name));
        }
    }

    json!({
        "type": "object",
        "properties": properties,
        "required": required,
        "additionalProperties": false,
    })
}

impl ToolSchemaPort for JsonSchemaToolConverter {
    fn tool_to_schema(&self, tool: &ToolSchema) -> Value {
        json!({
            "type": "function",
            "function": {
                "name": tool.name,
                "description": tool.description,
                "parameters": object_schema(&tool.input),
            }
        })
    }
}
