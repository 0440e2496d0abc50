//! Calendar backends
//!
//! Implementations of the [`CalendarBackend`](calagent_application::CalendarBackend)
//! port used by the calendar tools.

pub mod credential;
pub mod google;
pub mod memory;

pub use credential::{CalendarCredential, CredentialError};
pub use google::GoogleCalendarBackend;
pub use memory::InMemoryCalendar;
