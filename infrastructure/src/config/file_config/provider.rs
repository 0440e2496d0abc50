//! Tool provider configuration from TOML (`[provider]` section)

use crate::rpc::{ClientOptions, DEFAULT_MAX_FRAME_BYTES};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

/// How the agent starts and talks to its tool provider
///
/// # Example
///
/// ```toml
/// [provider]
/// command = "/usr/local/bin/calendar-agent"
/// args = ["serve", "--backend", "memory"]
/// discovery_timeout_secs = 10
/// call_timeout_secs = 30
/// ```
///
/// Without `command`, the agent runs its own executable with `serve`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FileProviderConfig {
    pub command: Option<String>,
    pub args: Vec<String>,
    pub env: HashMap<String, String>,
    pub discovery_timeout_secs: u64,
    pub call_timeout_secs: u64,
    pub max_frame_bytes: usize,
}

impl Default for FileProviderConfig {
    fn default() -> Self {
        Self {
            command: None,
            args: Vec::new(),
            env: HashMap::new(),
            discovery_timeout_secs: 10,
            call_timeout_secs: 30,
            max_frame_bytes: DEFAULT_MAX_FRAME_BYTES,
        }
    }
}

impl FileProviderConfig {
    /// Command and arguments used to spawn the provider.
    pub fn resolve_command(&self) -> std::io::Result<(String, Vec<String>)> {
        match &self.command {
            Some(command) => Ok((command.clone(), self.args.clone())),
            None => {
                let exe = std::env::current_exe()?;
                let mut args = vec!["serve".to_string()];
                args.extend(self.args.iter().cloned());
                Ok((exe.to_string_lossy().into_owned(), args))
            }
        }
    }

    pub fn client_options(&self) -> ClientOptions {
        ClientOptions {
            discovery_timeout: Duration::from_secs(self.discovery_timeout_secs),
            call_timeout: Duration::from_secs(self.call_timeout_secs),
            ..ClientOptions::default()
        }
    }
}
