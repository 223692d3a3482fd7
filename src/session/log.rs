// ABOUTME: JSONL transcript logger — appends each protocol exchange to a session file.
// ABOUTME: Diagnostic only; stdout stays reserved for the wire protocol.

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::config::Config;

/// A single JSONL transcript entry: when, which direction, and the payload.
#[derive(Debug, Serialize, Deserialize)]
pub struct TranscriptEntry {
    pub timestamp: DateTime<Utc>,
    /// "recv" for inbound lines, "send" for outbound responses.
    pub direction: String,
    pub payload: Value,
}

/// Appends protocol exchanges as JSONL lines to a per-session file.
pub struct TranscriptLogger {
    writer: BufWriter<File>,
    pub path: PathBuf,
}

impl TranscriptLogger {
    /// Create a transcript under the standard sessions directory, in a new
    /// file named with the current ISO timestamp.
    pub fn new() -> anyhow::Result<Self> {
        Self::new_in_dir(&Config::sessions_dir())
    }

    /// Create a transcript in a specific directory (for testing).
    pub fn new_in_dir(dir: &Path) -> anyhow::Result<Self> {
        fs::create_dir_all(dir)?;
        let timestamp = Utc::now().format("%Y-%m-%dT%H-%M-%S").to_string();
        let path = dir.join(format!("{}.jsonl", timestamp));
        let file = File::create(&path)?;
        Ok(Self {
            writer: BufWriter::new(file),
            path,
        })
    }

    /// Append one entry and flush it.
    pub fn log(&mut self, direction: &str, payload: Value) -> anyhow::Result<()> {
        let entry = TranscriptEntry {
            timestamp: Utc::now(),
            direction: direction.to_string(),
            payload,
        };
        let line = serde_json::to_string(&entry)?;
        writeln!(self.writer, "{}", line)?;
        self.writer.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transcript_writes_valid_jsonl() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path().join("sessions");

        let mut logger = TranscriptLogger::new_in_dir(&dir).unwrap();
        logger
            .log("recv", serde_json::json!({"cmd": "add_python_path", "path": "/x"}))
            .unwrap();

        let content = fs::read_to_string(&logger.path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 1, "should have exactly one line");

        let parsed: Value = serde_json::from_str(lines[0]).unwrap();
        let stamp = parsed["timestamp"].as_str().unwrap();
        assert!(
            stamp.parse::<DateTime<Utc>>().is_ok(),
            "timestamp should be RFC 3339, got {:?}",
            stamp,
        );
        assert_eq!(parsed["direction"], "recv");
        assert_eq!(parsed["payload"]["path"], "/x");
    }

    #[test]
    fn transcript_entry_roundtrip() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path().join("sessions");

        let mut logger = TranscriptLogger::new_in_dir(&dir).unwrap();
        logger
            .log("send", serde_json::json!({"reqId": 1, "prefix": "pri", "suggestions": []}))
            .unwrap();

        let content = fs::read_to_string(&logger.path).unwrap();
        let entry: TranscriptEntry = serde_json::from_str(content.lines().next().unwrap()).unwrap();
        assert_eq!(entry.direction, "send");
        assert_eq!(entry.payload["reqId"], 1);
    }

    #[test]
    fn transcript_appends_multiple_entries() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path().join("sessions");

        let mut logger = TranscriptLogger::new_in_dir(&dir).unwrap();
        logger.log("recv", serde_json::json!({"raw": "not json"})).unwrap();
        logger
            .log("send", serde_json::json!({"reqId": "debug", "debug": true}))
            .unwrap();
        logger.log("recv", serde_json::json!({"cmd": "noop"})).unwrap();

        let content = fs::read_to_string(&logger.path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 3, "should have three lines");
        for line in &lines {
            let _entry: TranscriptEntry = serde_json::from_str(line).unwrap();
        }
    }
}
