// ABOUTME: JediProvider — bridges completion calls to a long-lived Python helper subprocess.
// ABOUTME: One JSON object per line over the child's stdio; the helper source ships embedded.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child, ChildStdin, ChildStdout};
use tokio::sync::Mutex;
use tracing::debug;

use super::CompletionProvider;
use crate::protocol::Suggestion;

/// Python source of the helper, embedded so the binary is self-contained.
const HELPER_SOURCE: &str = include_str!("jedi_helper.py");

/// First line the helper writes after booting.
#[derive(Debug, Deserialize)]
struct Handshake {
    ready: bool,
    #[serde(rename = "jediVersion")]
    jedi_version: Option<String>,
    error: Option<String>,
}

/// One query line sent to the helper.
#[derive(Debug, Serialize)]
struct BridgeQuery<'a> {
    source: &'a str,
    /// One-based, matching what jedi expects.
    line: u32,
    column: u32,
    #[serde(rename = "searchPaths")]
    search_paths: &'a [String],
}

/// One reply line read back from the helper.
#[derive(Debug, Deserialize)]
struct BridgeReply {
    ok: bool,
    #[serde(default)]
    candidates: Vec<Suggestion>,
    #[serde(default)]
    error: Option<String>,
}

/// A live connection to the jedi helper subprocess.
///
/// The helper is spawned once per session and killed when this is dropped.
/// Per-query failures stay inside the helper and come back as `ok: false`
/// replies carrying the Python traceback text.
pub struct JediProvider {
    _child: Child,
    stdin: Mutex<ChildStdin>,
    stdout: Mutex<BufReader<ChildStdout>>,
}

impl JediProvider {
    /// Spawn `python_binary` running the embedded helper and wait for its
    /// ready handshake. Fallback jedi directories travel as helper argv.
    pub async fn spawn(python_binary: &str, fallback_jedi_paths: &[String]) -> Result<Self> {
        let mut child = tokio::process::Command::new(python_binary)
            .arg("-c")
            .arg(HELPER_SOURCE)
            .args(fallback_jedi_paths)
            .stdin(std::process::Stdio::piped())
            .stdout(std::process::Stdio::piped())
            .stderr(std::process::Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .with_context(|| format!("failed to spawn '{python_binary}'"))?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| anyhow::anyhow!("helper stdin not available"))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| anyhow::anyhow!("helper stdout not available"))?;
        let mut stdout = BufReader::new(stdout);

        let mut line = String::new();
        stdout
            .read_line(&mut line)
            .await
            .context("read helper handshake")?;
        if line.is_empty() {
            anyhow::bail!("helper exited before its handshake");
        }
        let handshake: Handshake =
            serde_json::from_str(line.trim()).context("parse helper handshake")?;
        if !handshake.ready {
            anyhow::bail!(
                "jedi unavailable: {}",
                handshake
                    .error
                    .unwrap_or_else(|| "unknown import failure".to_string())
            );
        }
        debug!(
            jedi = handshake.jedi_version.as_deref().unwrap_or("?"),
            "jedi helper ready"
        );

        Ok(Self {
            _child: child,
            stdin: Mutex::new(stdin),
            stdout: Mutex::new(stdout),
        })
    }
}

#[async_trait::async_trait]
impl CompletionProvider for JediProvider {
    async fn complete(
        &self,
        source: &str,
        line: u32,
        column: u32,
        search_paths: &[String],
    ) -> Result<Vec<Suggestion>> {
        let query = BridgeQuery {
            source,
            line,
            column,
            search_paths,
        };
        let mut payload = serde_json::to_string(&query)?;
        payload.push('\n');

        {
            let mut stdin = self.stdin.lock().await;
            stdin
                .write_all(payload.as_bytes())
                .await
                .context("write to jedi helper stdin")?;
            stdin.flush().await.context("flush jedi helper stdin")?;
        }

        let reply_line = {
            let mut stdout = self.stdout.lock().await;
            let mut buf = String::new();
            stdout
                .read_line(&mut buf)
                .await
                .context("read from jedi helper stdout")?;
            buf
        };
        if reply_line.is_empty() {
            anyhow::bail!("jedi helper closed stdout unexpectedly");
        }

        let reply: BridgeReply =
            serde_json::from_str(reply_line.trim()).context("parse jedi helper reply")?;
        if !reply.ok {
            anyhow::bail!(
                reply
                    .error
                    .unwrap_or_else(|| "jedi helper reported an unlabelled failure".to_string())
            );
        }
        Ok(reply.candidates)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn helper_source_is_embedded() {
        assert!(HELPER_SOURCE.contains("searchPaths"));
        assert!(HELPER_SOURCE.contains("\"ready\""));
    }

    #[test]
    fn handshake_parses_both_outcomes() {
        let ok: Handshake =
            serde_json::from_str(r#"{"ready": true, "jediVersion": "0.19.1"}"#).unwrap();
        assert!(ok.ready);
        assert_eq!(ok.jedi_version.as_deref(), Some("0.19.1"));
        assert!(ok.error.is_none());

        let missing: Handshake =
            serde_json::from_str(r#"{"ready": false, "error": "No module named 'jedi'"}"#).unwrap();
        assert!(!missing.ready);
        assert_eq!(missing.error.as_deref(), Some("No module named 'jedi'"));
    }

    #[test]
    fn bridge_query_uses_wire_names() {
        let paths = vec!["/opt/stubs".to_string()];
        let query = BridgeQuery {
            source: "import o",
            line: 1,
            column: 8,
            search_paths: &paths,
        };
        let v = serde_json::to_value(&query).unwrap();
        assert_eq!(v["source"], "import o");
        assert_eq!(v["line"], 1);
        assert_eq!(v["searchPaths"], serde_json::json!(["/opt/stubs"]));
        assert!(v.get("search_paths").is_none());
    }

    #[test]
    fn bridge_reply_parses_success_and_failure() {
        let ok: BridgeReply = serde_json::from_str(
            r#"{"ok": true, "candidates": [{"name": "os", "complete": "s",
                "description": "module os", "type": "module"}]}"#,
        )
        .unwrap();
        assert!(ok.ok);
        assert_eq!(ok.candidates.len(), 1);
        assert_eq!(ok.candidates[0].name, "os");

        let failed: BridgeReply =
            serde_json::from_str(r#"{"ok": false, "error": "Traceback (most recent call last)"}"#)
                .unwrap();
        assert!(!failed.ok);
        assert!(failed.candidates.is_empty());
        assert!(failed.error.unwrap().starts_with("Traceback"));
    }

    #[tokio::test]
    async fn spawn_fails_cleanly_for_missing_interpreter() {
        let result = JediProvider::spawn("jedi-bridge-no-such-python", &[]).await;
        let err = result.err().expect("spawn should fail");
        assert!(err.to_string().contains("jedi-bridge-no-such-python"));
    }
}
