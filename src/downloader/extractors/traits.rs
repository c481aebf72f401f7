// MediaEngine trait and common types

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::downloader::errors::DownloadError;
use crate::downloader::format_selector::ResolvedPlan;

/// Configuration for the extraction engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Explicit yt-dlp binary; discovered when unset
    pub ytdlp_path: Option<String>,
    /// ffmpeg binary or directory handed to yt-dlp
    pub ffmpeg_location: Option<String>,
    /// SOCKS5/HTTP proxy URL
    pub proxy: Option<String>,
    /// Path to cookies.txt file
    pub cookies_path: Option<String>,
    /// Network socket timeout passed to yt-dlp
    pub socket_timeout_secs: u32,
    /// Wall-clock limit for a metadata probe
    pub probe_timeout_secs: u64,
    /// Wall-clock limit for a full download + merge
    pub fetch_timeout_secs: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            ytdlp_path: None,
            ffmpeg_location: None,
            proxy: None,
            cookies_path: None,
            socket_timeout_secs: 30,
            probe_timeout_secs: 60,
            fetch_timeout_secs: 3600,
        }
    }
}

impl EngineConfig {
    pub fn with_proxy(mut self, proxy: Option<String>) -> Self {
        self.proxy = proxy;
        self
    }

    pub fn with_ffmpeg_location(mut self, location: Option<String>) -> Self {
        self.ffmpeg_location = location;
        self
    }
}

/// One raw format record as reported by the engine
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawFormat {
    /// Format ID (e.g., "137", "140")
    pub format_id: String,
    /// File extension (mp4, webm, m4a)
    pub ext: String,
    pub resolution: Option<String>,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub fps: Option<f32>,
    /// Video codec (avc1, vp9, av01, none)
    pub vcodec: Option<String>,
    /// Audio codec (mp4a, opus, none)
    pub acodec: Option<String>,
    pub filesize: Option<u64>,
    pub filesize_approx: Option<u64>,
    /// Total bitrate in kbps
    pub tbr: Option<f32>,
    /// Video bitrate in kbps
    pub vbr: Option<f32>,
    /// Audio bitrate in kbps
    pub abr: Option<f32>,
    pub format_note: Option<String>,
}

/// Everything a probe returns
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProbeResult {
    pub title: Option<String>,
    pub duration_seconds: Option<f64>,
    pub formats: Vec<RawFormat>,
}

/// The external extraction engine.
///
/// `fetch` writes whatever the engine produces into `output_dir`; picking the
/// artifact out of it is the caller's job.
#[async_trait]
pub trait MediaEngine: Send + Sync {
    /// Name of the engine (for logging)
    fn name(&self) -> &'static str;

    /// Resolve a URL to its available formats
    async fn probe(&self, url: &str) -> Result<ProbeResult, DownloadError>;

    /// Download (and post-process) the media selected by `plan`
    async fn fetch(
        &self,
        url: &str,
        plan: &ResolvedPlan,
        output_dir: &Path,
    ) -> Result<(), DownloadError>;
}
