//! Calendar backend configuration from TOML (`[calendar]` section)

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CalendarBackendKind {
    #[default]
    Google,
    Memory,
}

impl std::str::FromStr for CalendarBackendKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "google" => Ok(Self::Google),
            "memory" => Ok(Self::Memory),
            other => Err(format!("unknown calendar backend '{}' (expected google or memory)", other)),
        }
    }
}

/// # Example
///
/// ```toml
/// [calendar]
/// backend = "google"
/// calendar_id = "primary"
/// token_file = "token.json"
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FileCalendarConfig {
    pub backend: CalendarBackendKind,
    pub calendar_id: String,
    pub token_file: PathBuf,
    pub request_timeout_secs: u64,
}

impl Default for FileCalendarConfig {
    fn default() -> Self {
        Self {
            backend: CalendarBackendKind::Google,
            calendar_id: "primary".to_string(),
            token_file: PathBuf::from("token.json"),
            request_timeout_secs: 30,
        }
    }
}
