// ABOUTME: Entry point for jedi-bridge — an NDJSON stdio adapter for Python completions.
// ABOUTME: Parses CLI args, loads config, sets up stderr logging, and launches the app.

use clap::Parser;
use tracing_subscriber::EnvFilter;

use jedi_bridge::app::App;
use jedi_bridge::config::Config;

#[derive(Parser, Debug)]
#[command(name = "jedi-bridge", about = "Python completion engine over stdio", version)]
struct Cli {
    /// Python interpreter to run the completion helper with.
    #[arg(long)]
    python: Option<String>,

    /// Record every protocol exchange to a JSONL transcript.
    #[arg(long)]
    transcript: bool,

    /// Log filter, e.g. "debug" or "jedi_bridge=trace".
    #[arg(long)]
    log_level: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // stdout carries the protocol, so all diagnostics go to stderr.
    let filter = match &cli.log_level {
        Some(level) => EnvFilter::new(level),
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let mut config = Config::load()?;
    if let Some(python) = cli.python {
        config.python.binary = python;
    }
    if cli.transcript {
        config.session.transcript = true;
    }

    App::new(config).run().await
}
