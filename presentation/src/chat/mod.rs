//! Interactive chat module
//!
//! Provides a line-editor chat interface over a conversation session.

mod repl;

pub use repl::ChatRepl;
