//! Raw TOML configuration data types
//!
//! These structs represent the exact structure of the TOML config file.
//! Every section defaults, so an empty file is a valid configuration.

mod agent;
mod calendar;
mod logging;
mod model;
mod provider;

pub use agent::FileAgentConfig;
pub use calendar::{CalendarBackendKind, FileCalendarConfig};
pub use logging::FileLoggingConfig;
pub use model::FileModelConfig;
pub use provider::FileProviderConfig;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Configuration validation errors
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigValidationError {
    #[error("agent.max_iterations cannot be 0")]
    ZeroIterations,

    #[error("{0} cannot be 0")]
    ZeroTimeout(&'static str),

    #[error("provider.max_frame_bytes cannot be 0")]
    ZeroFrameSize,

    #[error("model.model cannot be empty")]
    EmptyModelName,
}

/// Complete configuration file
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FileConfig {
    pub agent: FileAgentConfig,
    pub provider: FileProviderConfig,
    pub model: FileModelConfig,
    pub calendar: FileCalendarConfig,
    pub logging: FileLoggingConfig,
}

impl FileConfig {
    pub fn validate(&self) -> Result<(), ConfigValidationError> {
        if self.agent.max_iterations == 0 {
            return Err(ConfigValidationError::ZeroIterations);
        }
        let timeouts = [
            ("provider.discovery_timeout_secs", self.provider.discovery_timeout_secs),
            ("provider.call_timeout_secs", self.provider.call_timeout_secs),
            ("model.request_timeout_secs", self.model.request_timeout_secs),
            ("calendar.request_timeout_secs", self.calendar.request_timeout_secs),
        ];
        if let Some((name, _)) = timeouts.iter().find(|(_, secs)| *secs == 0) {
            return Err(ConfigValidationError::ZeroTimeout(name));
        }
        if self.provider.max_frame_bytes == 0 {
            return Err(ConfigValidationError::ZeroFrameSize);
        }
        if self.model.model.trim().is_empty() {
            return Err(ConfigValidationError::EmptyModelName);
        }
        Ok(())
    }
}
