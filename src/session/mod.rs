// ABOUTME: Session module — the NDJSON request loop and its transcript logger.
// ABOUTME: Completion work goes through the provider seam; the loop owns everything else.

pub mod log;
pub mod r#loop;

pub use log::TranscriptLogger;
pub use r#loop::{SessionLoop, run_halted};
