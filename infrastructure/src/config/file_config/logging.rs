//! Logging configuration from TOML (`[logging]` section)

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// ```toml
/// [logging]
/// conversation_log = "~/.local/share/calendar-agent/conversation.jsonl"
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FileLoggingConfig {
    /// JSONL transcript of every session
    pub conversation_log: Option<PathBuf>,
}
