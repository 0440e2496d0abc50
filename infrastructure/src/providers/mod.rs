//! Reasoning gateway adapters

pub mod chat_completions;

pub use chat_completions::{ChatCompletionsConfig, ChatCompletionsGateway};
