// CLI engine - drives the native `yt-dlp` binary
//
// yt-dlp does both halves of the engine contract: `--dump-single-json` for
// probing and a regular run (with ffmpeg post-processors) for fetching.

use async_trait::async_trait;
use std::ffi::OsString;
use std::path::Path;

use super::traits::{EngineConfig, MediaEngine, ProbeResult, RawFormat};
use crate::downloader::errors::DownloadError;
use crate::downloader::format_selector::{PostProcessStep, ResolvedPlan};
use crate::downloader::tools::locate_binary;
use crate::downloader::utils::run_output_with_timeout;

/// Output template inside the request workspace
const OUTPUT_TEMPLATE: &str = "%(title)s.%(ext)s";

/// yt-dlp CLI engine
pub struct YtDlpEngine {
    ytdlp_path: String,
    config: EngineConfig,
}

impl YtDlpEngine {
    pub fn new(config: EngineConfig) -> Self {
        let ytdlp_path = locate_binary("yt-dlp", config.ytdlp_path.as_deref())
            .map(|p| p.to_string_lossy().into_owned())
            .unwrap_or_else(|| "yt-dlp".to_string());
        Self { ytdlp_path, config }
    }

    /// Flags shared by probe and fetch
    fn common_args(&self) -> Vec<OsString> {
        let mut args: Vec<OsString> = vec![
            "--no-playlist".into(),
            "--no-warnings".into(),
            "--socket-timeout".into(),
            self.config.socket_timeout_secs.to_string().into(),
        ];

        if let Some(proxy) = &self.config.proxy {
            args.push("--proxy".into());
            args.push(proxy.into());
        }

        if let Some(path) = &self.config.cookies_path {
            args.push("--cookies".into());
            args.push(path.into());
        }

        args
    }

    fn probe_args(&self, url: &str) -> Vec<OsString> {
        let mut args: Vec<OsString> = vec!["--dump-single-json".into(), "--skip-download".into()];
        args.extend(self.common_args());
        args.push("--".into());
        args.push(url.into());
        args
    }

    fn fetch_args(&self, url: &str, plan: &ResolvedPlan, output_dir: &Path) -> Vec<OsString> {
        let mut args: Vec<OsString> = vec![
            "-f".into(),
            plan.format_selector().into(),
            "--no-progress".into(),
            "--no-mtime".into(),
            "-P".into(),
            output_dir.as_os_str().to_owned(),
            "-o".into(),
            OUTPUT_TEMPLATE.into(),
        ];
        args.extend(self.common_args());

        if let Some(location) = &self.config.ffmpeg_location {
            args.push("--ffmpeg-location".into());
            args.push(location.into());
        }

        if let Some(container) = &plan.merge_output_format {
            args.push("--merge-output-format".into());
            args.push(container.into());
        }

        for step in &plan.post_processing {
            match step {
                PostProcessStep::ExtractAudio {
                    codec,
                    quality_kbps,
                } => {
                    args.push("-x".into());
                    args.push("--audio-format".into());
                    args.push(codec.as_str().into());
                    args.push("--audio-quality".into());
                    args.push(format!("{}K", quality_kbps).into());
                }
                PostProcessStep::RemuxVideo { container } => {
                    args.push("--remux-video".into());
                    args.push(container.into());
                }
                PostProcessStep::EmbedMetadata => args.push("--embed-metadata".into()),
            }
        }

        args.push("--".into());
        args.push(url.into());
        args
    }

    /// Parse `--dump-single-json` output; absent or oddly-typed fields become `None`
    fn parse_json(stdout: &[u8]) -> Result<ProbeResult, DownloadError> {
        let json: serde_json::Value = serde_json::from_slice(stdout)
            .map_err(|e| DownloadError::ParseError(format!("Invalid JSON: {}", e)))?;

        if !json.is_object() {
            return Err(DownloadError::ParseError("Expected a JSON object".to_string()));
        }

        Ok(ProbeResult {
            title: json["title"].as_str().map(|s| s.to_string()),
            duration_seconds: json["duration"].as_f64(),
            formats: Self::parse_formats(&json),
        })
    }

    fn parse_formats(json: &serde_json::Value) -> Vec<RawFormat> {
        let Some(formats_array) = json["formats"].as_array() else {
            return Vec::new();
        };

        formats_array
            .iter()
            .filter_map(|f| {
                let format_id = match &f["format_id"] {
                    serde_json::Value::String(s) => s.clone(),
                    serde_json::Value::Number(n) => n.to_string(),
                    _ => return None,
                };
                Some(RawFormat {
                    format_id,
                    ext: f["ext"].as_str().unwrap_or("").to_string(),
                    resolution: f["resolution"].as_str().map(|s| s.to_string()),
                    width: f["width"].as_u64().map(|w| w as u32),
                    height: f["height"].as_u64().map(|h| h as u32),
                    fps: f["fps"].as_f64().map(|fps| fps as f32),
                    vcodec: f["vcodec"].as_str().map(|s| s.to_string()),
                    acodec: f["acodec"].as_str().map(|s| s.to_string()),
                    filesize: f["filesize"].as_u64(),
                    filesize_approx: f["filesize_approx"]
                        .as_u64()
                        .or_else(|| f["filesize_approx"].as_f64().map(|s| s as u64)),
                    tbr: f["tbr"].as_f64().map(|t| t as f32),
                    vbr: f["vbr"].as_f64().map(|v| v as f32),
                    abr: f["abr"].as_f64().map(|a| a as f32),
                    format_note: f["format_note"].as_str().map(|s| s.to_string()),
                })
            })
            .collect()
    }

    fn log_command(&self, args: &[OsString]) {
        let line = args
            .iter()
            .map(|a| a.to_string_lossy())
            .collect::<Vec<_>>()
            .join(" ");
        tracing::debug!("running {} {}", self.ytdlp_path, line);
    }
}

#[async_trait]
impl MediaEngine for YtDlpEngine {
    fn name(&self) -> &'static str {
        "cli-yt-dlp"
    }

    async fn probe(&self, url: &str) -> Result<ProbeResult, DownloadError> {
        let args = self.probe_args(url);
        self.log_command(&args);

        let out = run_output_with_timeout(&self.ytdlp_path, args, self.config.probe_timeout_secs).await?;
        if !out.status.success() {
            let stderr = String::from_utf8_lossy(&out.stderr);
            tracing::warn!(url, status = %out.status, "probe failed: {}", stderr.trim());
            return Err(DownloadError::from_engine_output(&stderr));
        }

        let probe = Self::parse_json(&out.stdout)?;
        tracing::info!(url, formats = probe.formats.len(), "probe complete");
        Ok(probe)
    }

    async fn fetch(
        &self,
        url: &str,
        plan: &ResolvedPlan,
        output_dir: &Path,
    ) -> Result<(), DownloadError> {
        let args = self.fetch_args(url, plan, output_dir);
        self.log_command(&args);

        let out = run_output_with_timeout(&self.ytdlp_path, args, self.config.fetch_timeout_secs).await?;
        if !out.status.success() {
            let stderr = String::from_utf8_lossy(&out.stderr);
            tracing::warn!(url, status = %out.status, "fetch failed: {}", stderr.trim());
            return Err(DownloadError::from_engine_output(&stderr));
        }

        tracing::info!(url, selector = %plan.expression, "fetch complete");
        Ok(())
    }
}
