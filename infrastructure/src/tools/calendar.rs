//! Calendar tools
//!
//! Three tools backed by a [`CalendarBackend`]:
//!
//! | Tool | Input | Output |
//! |------|-------|--------|
//! | `create_event` | summary, description?, start, end | event |
//! | `get_events` | start, end | list of events |
//! | `delete_event` | id | `{status, id}` |

use std::sync::Arc;

use calagent_application::ports::calendar_backend::{BackendError, CalendarBackend};
use calagent_domain::{
    CalendarEvent, DeletedEvent, EventError, FieldSpec, NewEvent, TimeRange, ToolError,
    ToolErrorKind, ToolSchema, ValueType, parse_datetime,
};
use serde::Serialize;
use serde_json::{Map, Value};
use tracing::info;

use super::registry::{RegistryError, ToolRegistry};

pub const CREATE_EVENT: &str = "create_event";
pub const GET_EVENTS: &str = "get_events";
pub const DELETE_EVENT: &str = "delete_event";

fn event_type() -> ValueType {
    ValueType::record(vec![
        FieldSpec::required("id", ValueType::String),
        FieldSpec::required("summary", ValueType::String),
        FieldSpec::required("description", ValueType::String),
        FieldSpec::required("start", ValueType::DateTime),
        FieldSpec::required("end", ValueType::DateTime),
    ])
}

pub fn create_event_schema() -> ToolSchema {
    ToolSchema::new(
        CREATE_EVENT,
        "Create a calendar event. Times are ISO 8601; times without an offset are UTC.",
    )
    .with_input(FieldSpec::required("summary", ValueType::String).with_description("Event title"))
    .with_input(
        FieldSpec::optional("description", ValueType::String)
            .with_description("Longer description of the event"),
    )
    .with_input(FieldSpec::required("start", ValueType::DateTime).with_description("Start time"))
    .with_input(FieldSpec::required("end", ValueType::DateTime).with_description("End time"))
    .with_output(event_type())
}

pub fn get_events_schema() -> ToolSchema {
    ToolSchema::new(
        GET_EVENTS,
        "Get all events in the calendar between the given times.",
    )
    .with_input(
        FieldSpec::required("start", ValueType::DateTime).with_description("Start of the window"),
    )
    .with_input(
        FieldSpec::required("end", ValueType::DateTime)
            .with_description("End of the window (exclusive)"),
    )
    .with_output(ValueType::list(event_type()))
}

pub fn delete_event_schema() -> ToolSchema {
    ToolSchema::new(DELETE_EVENT, "Delete the event with the given id.")
        .with_input(FieldSpec::required("id", ValueType::String).with_description("Event id"))
        .with_output(ValueType::record(vec![
            FieldSpec::required("status", ValueType::String),
            FieldSpec::required("id", ValueType::String),
        ]))
}

/// Map a backend failure to the error the agent sees.
pub fn backend_error_to_tool_error(err: BackendError) -> ToolError {
    match err {
        BackendError::NotFound(id) => ToolError::not_found(id),
        other => ToolError::backend(other.to_string()),
    }
}

fn event_error_to_tool_error(err: EventError) -> ToolError {
    ToolError::new(ToolErrorKind::Validation, err.to_string())
}

fn datetime_arg(args: &Map<String, Value>, key: &str) -> Result<chrono::DateTime<chrono::Utc>, ToolError> {
    args.get(key)
        .and_then(Value::as_str)
        .and_then(parse_datetime)
        .ok_or_else(|| {
            ToolError::new(
                ToolErrorKind::Validation,
                format!("field '{}' is not an ISO-8601 datetime", key),
            )
        })
}

fn string_arg<'a>(args: &'a Map<String, Value>, key: &str) -> Result<&'a str, ToolError> {
    args.get(key).and_then(Value::as_str).ok_or_else(|| {
        ToolError::new(
            ToolErrorKind::Validation,
            format!("missing required field '{}'", key),
        )
    })
}

fn to_value<T: Serialize>(value: &T) -> Result<Value, ToolError> {
    serde_json::to_value(value).map_err(|e| ToolError::handler(e.to_string()))
}

async fn create_event(
    backend: Arc<dyn CalendarBackend>,
    args: Map<String, Value>,
) -> Result<Value, ToolError> {
    let description = args
        .get("description")
        .and_then(Value::as_str)
        .map(str::to_string);
    let event = NewEvent::new(
        string_arg(&args, "summary")?,
        description,
        datetime_arg(&args, "start")?,
        datetime_arg(&args, "end")?,
    )
    .map_err(event_error_to_tool_error)?;

    let created: CalendarEvent = backend
        .create_event(event)
        .await
        .map_err(backend_error_to_tool_error)?;
    info!(id = %created.id, "Created event");
    to_value(&created)
}

async fn get_events(
    backend: Arc<dyn CalendarBackend>,
    args: Map<String, Value>,
) -> Result<Value, ToolError> {
    let range = TimeRange::new(datetime_arg(&args, "start")?, datetime_arg(&args, "end")?)
        .map_err(event_error_to_tool_error)?;
    let events = backend
        .list_events(range)
        .await
        .map_err(backend_error_to_tool_error)?;
    to_value(&events)
}

async fn delete_event(
    backend: Arc<dyn CalendarBackend>,
    args: Map<String, Value>,
) -> Result<Value, ToolError> {
    let id = string_arg(&args, "id")?.to_string();
    backend
        .delete_event(&id)
        .await
        .map_err(backend_error_to_tool_error)?;
    info!(id = %id, "Deleted event");
    to_value(&DeletedEvent::new(id))
}

/// Registry with the three calendar tools bound to `backend`.
pub fn calendar_registry(backend: Arc<dyn CalendarBackend>) -> Result<ToolRegistry, RegistryError> {
    let mut registry = ToolRegistry::new();

    let b = backend.clone();
    registry.register(create_event_schema(), move |args| create_event(b.clone(), args))?;
    let b = backend.clone();
    registry.register(get_events_schema(), move |args| get_events(b.clone(), args))?;
    registry.register(delete_event_schema(), move |args| {
        delete_event(backend.clone(), args)
    })?;

    Ok(registry)
}
