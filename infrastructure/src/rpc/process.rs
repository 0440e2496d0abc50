//! Tool provider child process.
//!
//! The agent spawns the provider with piped stdin/stdout, which become the
//! two halves of the [`Channel`]. The provider's stderr is inherited so its
//! logs reach the terminal.

use super::channel::Channel;
use super::error::ClientError;
use std::collections::HashMap;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::{Child, Command};
use tracing::{debug, warn};

/// How long a provider gets to exit on its own after `shutdown`.
const EXIT_GRACE: Duration = Duration::from_secs(2);

pub struct ProviderProcess {
    child: Child,
    command: String,
}

impl ProviderProcess {
    /// Start the provider and return it with a channel over its stdio.
    pub fn spawn(
        command: &str,
        args: &[String],
        env: &HashMap<String, String>,
        max_frame_bytes: usize,
    ) -> Result<(Self, Channel), ClientError> {
        debug!(command = %command, ?args, "Spawning tool provider");

        let mut cmd = Command::new(command);
        cmd.args(args)
            .envs(env)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .kill_on_drop(true);

        // Linux: SIGTERM the provider if the agent dies without running Drop.
        #[cfg(target_os = "linux")]
        unsafe {
            cmd.pre_exec(|| {
                libc::prctl(libc::PR_SET_PDEATHSIG, libc::SIGTERM);
                Ok(())
            });
        }

        let mut child = cmd.spawn().map_err(ClientError::Spawn)?;
        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| ClientError::Channel("provider stdin not captured".into()))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| ClientError::Channel("provider stdout not captured".into()))?;

        let process = Self {
            child,
            command: command.to_string(),
        };
        Ok((process, Channel::new(stdout, stdin, max_frame_bytes)))
    }

    pub fn id(&self) -> Option<u32> {
        self.child.id()
    }

    /// Wait briefly for the provider to exit, then kill it.
    pub async fn terminate(&mut self) {
        match tokio::time::timeout(EXIT_GRACE, self.child.wait()).await {
            Ok(Ok(status)) => debug!(command = %self.command, %status, "Tool provider exited"),
            Ok(Err(e)) => warn!(command = %self.command, error = %e, "Failed to wait for tool provider"),
            Err(_) => {
                warn!(command = %self.command, "Tool provider did not exit, killing it");
                if let Err(e) = self.child.kill().await {
                    warn!(error = %e, "Failed to kill tool provider");
                }
            }
        }
    }
}

impl Drop for ProviderProcess {
    fn drop(&mut self) {
        let _ = self.child.start_kill();
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::rpc::framing::DEFAULT_MAX_FRAME_BYTES;
    use serde_json::json;

    #[tokio::test]
    async fn test_spawned_process_channel_round_trips_through_cat() {
        let (mut process, channel) =
            ProviderProcess::spawn("cat", &[], &HashMap::new(), DEFAULT_MAX_FRAME_BYTES).unwrap();
        assert!(process.id().is_some());

        let (mut reader, writer) = channel.split();
        writer.send(&json!({"echo": true})).await.unwrap();
        assert_eq!(reader.receive().await.unwrap(), Some(json!({"echo": true})));

        writer.close().await;
        assert_eq!(reader.receive().await.unwrap(), None);
        process.terminate().await;
    }

    #[tokio::test]
    async fn test_missing_binary_is_spawn_error() {
        let result = ProviderProcess::spawn(
            "/nonexistent/calendar-provider",
            &[],
            &HashMap::new(),
            DEFAULT_MAX_FRAME_BYTES,
        );
        assert!(matches!(result, Err(ClientError::Spawn(_))));
    }
}
