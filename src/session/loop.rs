// ABOUTME: Session loop — reads NDJSON lines, dispatches commands and queries, answers in-band.
// ABOUTME: One request's failure degrades to a diagnostic response; only EOF stops the loop.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Serialize;
use serde_json::Value;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tracing::{debug, trace, warn};

use crate::protocol::{
    Command, CompletionQuery, JEDI_MISSING, RawErrorResponse, StartupMessage, SuggestionResponse,
};
use crate::provider::CompletionProvider;
use crate::session::log::TranscriptLogger;

/// Sleep period for the halted (provider-missing) mode.
const IDLE_SLEEP: Duration = Duration::from_secs(10);

/// The per-process request loop.
///
/// Owns the module search path state (appended to by `add_python_path`,
/// handed to the provider on every query) and drives one request to
/// completion at a time: read a line, answer it, flush, repeat.
pub struct SessionLoop<R, W> {
    provider: Arc<dyn CompletionProvider>,
    reader: R,
    writer: W,
    search_paths: Vec<String>,
    transcript: Option<TranscriptLogger>,
}

impl<R, W> SessionLoop<R, W>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    pub fn new(provider: Arc<dyn CompletionProvider>, reader: R, writer: W) -> Self {
        Self {
            provider,
            reader,
            writer,
            search_paths: Vec::new(),
            transcript: None,
        }
    }

    /// Attach an optional transcript logger.
    pub fn with_transcript(mut self, transcript: Option<TranscriptLogger>) -> Self {
        self.transcript = transcript;
        self
    }

    /// Run until the input stream ends.
    ///
    /// Only transport failures (stdin or stdout gone) propagate out of here;
    /// every request-level failure is answered in-band and the loop keeps
    /// serving.
    pub async fn run(mut self) -> Result<()> {
        let mut line = String::new();
        loop {
            line.clear();
            let read = self
                .reader
                .read_line(&mut line)
                .await
                .context("read request line")?;
            if read == 0 {
                debug!("input stream closed, shutting down");
                return Ok(());
            }
            self.handle_line(&line).await?;
        }
    }

    /// Dispatch one raw input line. Returns Err only on output transport
    /// failure.
    async fn handle_line(&mut self, raw: &str) -> Result<()> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            debug!("skipping blank line");
            return Ok(());
        }
        trace!(raw = trimmed, "request line");
        self.log_recv(trimmed);

        let value: Value = match serde_json::from_str(trimmed) {
            Ok(v) => v,
            Err(e) => {
                warn!(error = %e, "unparsable request line");
                let err = anyhow::Error::new(e).context("parse request line");
                let resp = RawErrorResponse::new(error_chain(&err), trimmed);
                return self.respond(&resp).await;
            }
        };

        // A `cmd` field marks a control command regardless of any other
        // fields present.
        if value.get("cmd").is_some() {
            self.handle_command(value);
            return Ok(());
        }

        self.handle_query(value, trimmed).await
    }

    /// Apply a control command. Commands never produce output.
    fn handle_command(&mut self, value: Value) {
        match serde_json::from_value::<Command>(value) {
            Ok(Command::AddPythonPath { path }) => {
                debug!(path = %path, "extending module search path");
                self.search_paths.push(path);
            }
            Ok(Command::Unknown) => {
                debug!("ignoring unrecognized command");
            }
            Err(e) => {
                warn!(error = %e, "malformed command ignored");
            }
        }
    }

    /// Answer one completion query with exactly one response line.
    async fn handle_query(&mut self, value: Value, raw: &str) -> Result<()> {
        let query: CompletionQuery = match serde_json::from_value(value.clone()) {
            Ok(q) => q,
            Err(e) => {
                // Echo the query's own source when it has one; the raw line
                // is all there is to echo otherwise.
                let source = value
                    .get("source")
                    .and_then(Value::as_str)
                    .unwrap_or(raw)
                    .to_string();
                warn!(error = %e, "malformed completion query");
                let err = anyhow::Error::new(e).context("malformed completion query");
                return self
                    .respond(&RawErrorResponse::new(error_chain(&err), source))
                    .await;
            }
        };

        debug!(line = query.line, column = query.column, "completion query");
        // The wire is zero-based; the provider speaks one-based lines.
        // `line` is peer-controlled: saturate, never overflow.
        let outcome = self
            .provider
            .complete(
                &query.source,
                query.line.saturating_add(1),
                query.column,
                &self.search_paths,
            )
            .await;

        match outcome {
            Ok(suggestions) => {
                debug!(count = suggestions.len(), "completion ready");
                self.respond(&SuggestionResponse::new(&query, suggestions))
                    .await
            }
            Err(e) => {
                warn!(error = %e, "completion failed");
                self.respond(&RawErrorResponse::new(error_chain(&e), query.source.clone()))
                    .await
            }
        }
    }

    /// Serialize one response and write it as a single flushed line. Direct
    /// struct serialization keeps the wire's declared field order.
    async fn respond<T: Serialize>(&mut self, response: &T) -> Result<()> {
        let mut line = serde_json::to_string(response).context("serialize response")?;
        trace!(payload = %line, "response line");
        self.log_send(&line);
        line.push('\n');
        self.writer
            .write_all(line.as_bytes())
            .await
            .context("write response line")?;
        self.writer.flush().await.context("flush response line")?;
        Ok(())
    }

    fn log_recv(&mut self, raw: &str) {
        if let Some(transcript) = self.transcript.as_mut() {
            let payload = serde_json::from_str(raw)
                .unwrap_or_else(|_| serde_json::json!({ "raw": raw }));
            if let Err(e) = transcript.log("recv", payload) {
                warn!(error = %e, "transcript write failed");
            }
        }
    }

    fn log_send(&mut self, line: &str) {
        if let Some(transcript) = self.transcript.as_mut() {
            let payload = serde_json::from_str(line)
                .unwrap_or_else(|_| serde_json::json!({ "raw": line }));
            if let Err(e) = transcript.log("send", payload) {
                warn!(error = %e, "transcript write failed");
            }
        }
    }
}

/// Degraded mode for a process whose provider never loaded: say so once,
/// then sleep forever. Nothing is ever read; the peer has to kill us.
pub async fn run_halted<W>(mut writer: W) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    let msg = StartupMessage::halt(JEDI_MISSING);
    let mut line = serde_json::to_string(&msg).context("serialize startup message")?;
    line.push('\n');
    writer
        .write_all(line.as_bytes())
        .await
        .context("write startup message")?;
    writer.flush().await.context("flush startup message")?;
    loop {
        tokio::time::sleep(IDLE_SLEEP).await;
    }
}

/// Render an error and its cause chain the way the wire's `stacktrace`
/// field expects: outermost message first, one cause per line.
fn error_chain(err: &anyhow::Error) -> String {
    let mut out = err.to_string();
    for cause in err.chain().skip(1) {
        out.push_str("\ncaused by: ");
        out.push_str(&cause.to_string());
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    struct NoopProvider;

    #[async_trait]
    impl CompletionProvider for NoopProvider {
        async fn complete(
            &self,
            _source: &str,
            _line: u32,
            _column: u32,
            _search_paths: &[String],
        ) -> Result<Vec<crate::protocol::Suggestion>> {
            Ok(vec![])
        }
    }

    fn test_loop() -> SessionLoop<&'static [u8], Vec<u8>> {
        SessionLoop::new(Arc::new(NoopProvider), &[][..], Vec::new())
    }

    #[test]
    fn error_chain_renders_causes_in_order() {
        let io = std::io::Error::other("pipe closed");
        let err = anyhow::Error::new(io).context("read helper reply");
        let rendered = error_chain(&err);
        assert_eq!(rendered, "read helper reply\ncaused by: pipe closed");
    }

    #[test]
    fn error_chain_single_error_has_no_cause_lines() {
        let err = anyhow::anyhow!("Traceback (most recent call last): boom");
        assert_eq!(error_chain(&err), "Traceback (most recent call last): boom");
    }

    #[test]
    fn add_python_path_appends_in_order() {
        let mut session = test_loop();
        session.handle_command(serde_json::json!({"cmd": "add_python_path", "path": "/a"}));
        session.handle_command(serde_json::json!({"cmd": "add_python_path", "path": "/b"}));
        assert_eq!(session.search_paths, vec!["/a".to_string(), "/b".to_string()]);
    }

    #[test]
    fn unknown_command_leaves_state_untouched() {
        let mut session = test_loop();
        session.handle_command(serde_json::json!({"cmd": "restart", "path": "/a"}));
        assert!(session.search_paths.is_empty());
    }

    #[test]
    fn malformed_add_python_path_is_ignored() {
        let mut session = test_loop();
        session.handle_command(serde_json::json!({"cmd": "add_python_path"}));
        session.handle_command(serde_json::json!({"cmd": "add_python_path", "path": 42}));
        assert!(session.search_paths.is_empty());
    }
}
