//! Configuration file loading for calendar-agent
//!
//! This module handles file I/O and merging of configuration from multiple sources.
//! The priority order (highest to lowest):
//!
//! 1. `CALAGENT_*` environment variables
//! 2. `--config <path>` specified file
//! 3. Project: `./calendar-agent.toml`
//! 4. Global: `$XDG_CONFIG_HOME/calendar-agent/config.toml`
//! 5. Default values
//!
//! Command-line flags are applied on top by the binary.

mod file_config;
mod loader;

pub use file_config::{
    CalendarBackendKind, ConfigValidationError, FileAgentConfig, FileCalendarConfig, FileConfig,
    FileLoggingConfig, FileModelConfig, FileProviderConfig,
};
pub use loader::{ConfigError, ConfigLoader};
