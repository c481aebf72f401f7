// Downloader module - format classification, selection and fetch orchestration

pub mod classifier;
pub mod errors;
pub mod expression;
pub mod extractors;
pub mod format_selector;
pub mod models;
pub mod orchestrator;
pub mod tools;
pub mod utils;

pub use errors::DownloadError;
pub use extractors::{EngineConfig, MediaEngine, YtDlpEngine};
pub use format_selector::{FormatSelector, ResolvedPlan};
pub use models::{AudioCodec, DownloadIntent, DownloadRequest, FormatCatalog, Preset, StreamDescriptor};
pub use orchestrator::{Downloader, FetchResult};
