// Extraction engine boundary
//
// The core never talks to yt-dlp directly; it goes through `MediaEngine`,
// which tests replace with a fake.

pub mod cli;
pub mod diagnostics;
mod traits;

pub use cli::YtDlpEngine;
pub use diagnostics::{diagnose_error, BlockingReason};
pub use traits::{EngineConfig, MediaEngine, ProbeResult, RawFormat};
