// ABOUTME: Wire types for the editor-facing NDJSON protocol.
// ABOUTME: Commands, completion queries, suggestions, and the three response envelopes.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Startup code emitted when the completion provider failed to load.
pub const JEDI_MISSING: &str = "jedi-missing";

/// A control command — any input line carrying a `cmd` field.
///
/// Unrecognized `cmd` values deserialize as `Unknown` and are treated as
/// forward-compatible no-ops rather than errors.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "cmd")]
pub enum Command {
    /// Append a directory to the module search path consulted by the provider.
    #[serde(rename = "add_python_path")]
    AddPythonPath { path: String },
    #[serde(other)]
    Unknown,
}

/// One completion request from the editor.
#[derive(Debug, Clone, Deserialize)]
pub struct CompletionQuery {
    /// Opaque request tag, echoed verbatim in the response. Any JSON value.
    #[serde(rename = "reqId")]
    pub req_id: Value,
    /// The fragment being completed, echoed verbatim in the response.
    pub prefix: String,
    /// Full buffer text to analyze.
    pub source: String,
    /// Cursor line, zero-based on the wire (one-based for the provider).
    pub line: u32,
    /// Cursor column, zero-based character offset.
    pub column: u32,
}

/// Parameter metadata for one callable completion candidate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParamInfo {
    pub name: String,
    pub description: String,
}

/// One candidate completion with display and type metadata.
///
/// The same shape travels on both wires: the helper bridge produces it and
/// the editor-facing success response embeds it unchanged.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Suggestion {
    /// Candidate symbol name.
    pub name: String,
    /// Remaining text to insert after the prefix.
    pub complete: String,
    /// Human-readable description (signature or definition line).
    pub description: String,
    /// Candidate type tag, e.g. "function" or "module". `type` on the wire.
    #[serde(rename = "type")]
    pub kind: String,
    /// Ordered parameter metadata; empty when the provider exposes none.
    #[serde(default)]
    pub params: Vec<ParamInfo>,
    /// Documentation string; omitted entirely when the provider lacks it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub docstring: Option<String>,
}

/// Successful answer to a completion query.
#[derive(Debug, Clone, Serialize)]
pub struct SuggestionResponse {
    #[serde(rename = "reqId")]
    pub req_id: Value,
    pub prefix: String,
    pub suggestions: Vec<Suggestion>,
}

impl SuggestionResponse {
    /// Build the success envelope, echoing the query's tag and prefix.
    pub fn new(query: &CompletionQuery, suggestions: Vec<Suggestion>) -> Self {
        Self {
            req_id: query.req_id.clone(),
            prefix: query.prefix.clone(),
            suggestions,
        }
    }
}

/// Diagnostic answer emitted when building a suggestion list failed.
///
/// The peer recognizes it by `reqId == "debug"` and must not treat it as a
/// completion result.
#[derive(Debug, Clone, Serialize)]
pub struct RawErrorResponse {
    #[serde(rename = "reqId")]
    pub req_id: String,
    pub debug: bool,
    pub level: String,
    pub stacktrace: String,
    pub source: String,
}

impl RawErrorResponse {
    /// Wrap a failure's formatted text and the offending source in the
    /// fixed `reqId: "debug"` envelope.
    pub fn new(stacktrace: impl Into<String>, source: impl Into<String>) -> Self {
        Self {
            req_id: "debug".to_string(),
            debug: true,
            level: "error".to_string(),
            stacktrace: stacktrace.into(),
            source: source.into(),
        }
    }
}

/// One-shot startup notification telling the peer no completions will ever
/// arrive from this process.
#[derive(Debug, Clone, Serialize)]
pub struct StartupMessage {
    #[serde(rename = "reqId")]
    pub req_id: String,
    pub msg: String,
    pub halt: bool,
}

impl StartupMessage {
    /// Build the halting startup envelope around a message code.
    pub fn halt(code: &str) -> Self {
        Self {
            req_id: "msg".to_string(),
            msg: code.to_string(),
            halt: true,
        }
    }
}
