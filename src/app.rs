// ABOUTME: App orchestrator — wires together config, the jedi provider, and the session loop.
// ABOUTME: Falls back to the halted loop when no working Python/jedi environment is found.

use tokio::io::BufReader;
use tracing::{info, warn};

use crate::config::Config;
use crate::provider::create_provider;
use crate::session::{SessionLoop, TranscriptLogger, run_halted};

/// Top-level application that owns the stdio session.
pub struct App {
    config: Config,
}

impl App {
    /// Create a new app with the given configuration.
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    /// Run the application: start the completion provider and drive the
    /// stdin/stdout session until the editor closes the pipe.
    pub async fn run(self) -> anyhow::Result<()> {
        let provider = match create_provider(&self.config.python).await {
            Ok(provider) => provider,
            Err(e) => {
                warn!(error = %e, "completion engine unavailable, entering halted mode");
                return run_halted(tokio::io::stdout()).await;
            }
        };
        info!(python = %self.config.python.binary, "completion engine ready");

        let transcript = if self.config.session.transcript {
            match TranscriptLogger::new() {
                Ok(logger) => {
                    info!(path = %logger.path.display(), "session transcript enabled");
                    Some(logger)
                }
                Err(e) => {
                    warn!(error = %e, "failed to create session transcript");
                    None
                }
            }
        } else {
            None
        };

        let reader = BufReader::new(tokio::io::stdin());
        let writer = tokio::io::stdout();
        SessionLoop::new(provider, reader, writer)
            .with_transcript(transcript)
            .run()
            .await
    }
}
