//! Calendar domain: event records shared by the calendar tools and the
//! backends that store them.

pub mod entities;

pub use entities::{CalendarEvent, DeletedEvent, EventError, NewEvent, TimeRange};
