//! Conversation domain.
//!
//! - [`entities::Turn`]: one user, agent or tool-result entry
//! - [`entities::ConversationState`]: the append-only transcript of a session

pub mod entities;

pub use entities::{ConversationState, Role, Turn};
