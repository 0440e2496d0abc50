//! Calendar backend port
//!
//! The calendar service the tool handlers talk to. Authentication and
//! storage live behind this trait.

use async_trait::async_trait;
use calagent_domain::{CalendarEvent, NewEvent, TimeRange};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BackendError {
    /// The service refused the request
    #[error("Calendar rejected the request: {0}")]
    Rejected(String),

    #[error("Event not found: {0}")]
    NotFound(String),

    #[error("Not authorized: {0}")]
    Unauthorized(String),

    /// The service could not be reached
    #[error("Transport error: {0}")]
    Transport(String),
}

#[async_trait]
pub trait CalendarBackend: Send + Sync {
    /// Store a new event and return it with its assigned id.
    async fn create_event(&self, event: NewEvent) -> Result<CalendarEvent, BackendError>;

    /// Events overlapping `range`, ordered by start time.
    async fn list_events(&self, range: TimeRange) -> Result<Vec<CalendarEvent>, BackendError>;

    async fn delete_event(&self, id: &str) -> Result<(), BackendError>;
}
