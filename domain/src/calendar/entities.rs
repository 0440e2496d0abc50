//! Calendar records exchanged between tool handlers and backends

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EventError {
    #[error("event summary cannot be empty")]
    EmptySummary,

    #[error("event ends ({end}) before it starts ({start})")]
    EndBeforeStart {
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    },
}

/// Request to create an event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewEvent {
    pub summary: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl NewEvent {
    pub fn new(
        summary: impl Into<String>,
        description: Option<String>,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Self, EventError> {
        let summary = summary.into();
        if summary.trim().is_empty() {
            return Err(EventError::EmptySummary);
        }
        if end < start {
            return Err(EventError::EndBeforeStart { start, end });
        }
        Ok(Self {
            summary,
            description,
            start,
            end,
        })
    }
}

/// An event as stored by the backend.
///
/// `description` is always present; a backend with no description yields
/// an empty string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalendarEvent {
    pub id: String,
    pub summary: String,
    #[serde(default)]
    pub description: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl CalendarEvent {
    pub fn from_new(id: impl Into<String>, event: NewEvent) -> Self {
        Self {
            id: id.into(),
            summary: event.summary,
            description: event.description.unwrap_or_default(),
            start: event.start,
            end: event.end,
        }
    }
}

/// Half-open query window `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeRange {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl TimeRange {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Self, EventError> {
        if end < start {
            return Err(EventError::EndBeforeStart { start, end });
        }
        Ok(Self { start, end })
    }

    /// Whether the event intersects the window.
    ///
    /// Zero-length events are included when their instant falls inside it.
    pub fn overlaps(&self, event: &CalendarEvent) -> bool {
        if event.start == event.end {
            return event.start >= self.start && event.start < self.end;
        }
        event.start < self.end && event.end > self.start
    }
}

/// Confirmation returned by `delete_event`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeletedEvent {
    pub status: String,
    pub id: String,
}

impl DeletedEvent {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            status: "deleted".to_string(),
            id: id.into(),
        }
    }
}
