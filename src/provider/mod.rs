// ABOUTME: Completion provider seam — trait, candidate flow, and the production factory.
// ABOUTME: The session loop only ever sees `dyn CompletionProvider`, keeping it testable in-process.

pub mod jedi;

pub use jedi::JediProvider;

use std::sync::Arc;

use async_trait::async_trait;

use crate::config::PythonConfig;
use crate::protocol::Suggestion;

/// A source of completion candidates for a cursor position in a buffer.
///
/// `line` is one-based here — the session loop converts from the wire's
/// zero-based value before calling. `column` is a zero-based character
/// offset. `search_paths` is the session's full module search path list,
/// passed on every call; implementations must apply it idempotently.
#[async_trait]
pub trait CompletionProvider: Send + Sync {
    async fn complete(
        &self,
        source: &str,
        line: u32,
        column: u32,
        search_paths: &[String],
    ) -> anyhow::Result<Vec<Suggestion>>;
}

/// Spawn the production provider: the jedi helper subprocess.
///
/// An error here means "jedi-missing" — the caller is expected to fall into
/// the halted session mode rather than propagate it as a crash.
pub async fn create_provider(config: &PythonConfig) -> anyhow::Result<Arc<dyn CompletionProvider>> {
    let provider = JediProvider::spawn(&config.binary, &config.fallback_jedi_paths).await?;
    Ok(Arc::new(provider))
}
