//! JSONL transcript writer.
//!
//! Every [`ConversationEvent`] becomes one line: the event payload with
//! `type`, `timestamp` and `session` fields merged in. Sessions append to
//! the same file, so the `session` field tells runs apart.

use calagent_application::{ConversationEvent, ConversationLogger};
use serde_json::{Map, Value};
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::warn;

/// Appends conversation events to a JSONL file.
///
/// Writes go through `Mutex<BufWriter<File>>` and are flushed per line.
pub struct JsonlConversationLogger {
    writer: Mutex<BufWriter<File>>,
    path: PathBuf,
    session: String,
}

impl JsonlConversationLogger {
    /// Open (or create) the transcript at `path`, creating parent directories.
    pub fn open(path: impl AsRef<Path>) -> std::io::Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        let session = chrono::Utc::now().format("%Y%m%dT%H%M%S%.3fZ").to_string();

        Ok(Self {
            writer: Mutex::new(BufWriter::new(file)),
            path: path.to_path_buf(),
            session,
        })
    }

    /// Like [`open`](Self::open), but logs the failure and returns `None`.
    pub fn open_or_warn(path: impl AsRef<Path>) -> Option<Self> {
        let path = path.as_ref();
        match Self::open(path) {
            Ok(logger) => Some(logger),
            Err(e) => {
                warn!("Could not open conversation log {}: {}", path.display(), e);
                None
            }
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn session(&self) -> &str {
        &self.session
    }

    fn record(&self, event: ConversationEvent) -> Value {
        let timestamp = chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true);
        let mut map = match event.payload {
            Value::Object(map) => map,
            other => {
                let mut map = Map::new();
                map.insert("data".to_string(), other);
                map
            }
        };
        map.insert("type".to_string(), Value::from(event.event_type));
        map.insert("timestamp".to_string(), Value::String(timestamp));
        map.insert("session".to_string(), Value::String(self.session.clone()));
        Value::Object(map)
    }
}

impl ConversationLogger for JsonlConversationLogger {
    fn log(&self, event: ConversationEvent) {
        let Ok(line) = serde_json::to_string(&self.record(event)) else {
            return;
        };

        let mut writer = self.writer.lock().unwrap_or_else(|p| p.into_inner());
        if let Err(e) = writeln!(writer, "{}", line).and_then(|_| writer.flush()) {
            warn!("Conversation log write failed: {}", e);
        }
    }
}

impl Drop for JsonlConversationLogger {
    fn drop(&mut self) {
        let mut writer = self.writer.lock().unwrap_or_else(|p| p.into_inner());
        let _ = writer.flush();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn read_lines(path: &Path) -> Vec<Value> {
        std::fs::read_to_string(path)
            .unwrap()
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect()
    }

    #[test]
    fn test_writes_one_object_per_event() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("transcript.jsonl");
        let logger = JsonlConversationLogger::open(&path).unwrap();

        logger.log(ConversationEvent::new(
            "user_turn",
            json!({ "content": "what's on friday?" }),
        ));
        logger.log(ConversationEvent::new(
            "tool_call",
            json!({ "tool": "get_events", "arguments": { "start": "2025-01-10T00:00:00Z" } }),
        ));
        drop(logger);

        let lines = read_lines(&path);
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0]["type"], "user_turn");
        assert_eq!(lines[0]["content"], "what's on friday?");
        assert_eq!(lines[1]["type"], "tool_call");
        assert_eq!(lines[1]["tool"], "get_events");
        for line in &lines {
            assert!(line["timestamp"].as_str().unwrap().ends_with('Z'));
            assert_eq!(line["session"], lines[0]["session"]);
        }
    }

    #[test]
    fn test_non_object_payload_goes_under_data() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("transcript.jsonl");
        let logger = JsonlConversationLogger::open(&path).unwrap();

        logger.log(ConversationEvent::new("final_answer", json!("Done.")));
        drop(logger);

        let lines = read_lines(&path);
        assert_eq!(lines[0]["type"], "final_answer");
        assert_eq!(lines[0]["data"], "Done.");
    }

    #[test]
    fn test_reopen_appends() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("transcript.jsonl");

        let first = JsonlConversationLogger::open(&path).unwrap();
        first.log(ConversationEvent::new("user_turn", json!({ "content": "one" })));
        drop(first);

        let second = JsonlConversationLogger::open(&path).unwrap();
        second.log(ConversationEvent::new("user_turn", json!({ "content": "two" })));
        drop(second);

        let lines = read_lines(&path);
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[1]["content"], "two");
    }

    #[test]
    fn test_open_or_warn_on_unwritable_path() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("plain");
        std::fs::write(&file, b"x").unwrap();
        // a regular file cannot be a parent directory
        assert!(JsonlConversationLogger::open_or_warn(file.join("log.jsonl")).is_none());
    }
}
