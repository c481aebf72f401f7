// External tool discovery - yt-dlp and ffmpeg

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::process::Command;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum ToolType {
    YtDlp,
    Ffmpeg,
}

impl ToolType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ToolType::YtDlp => "yt-dlp",
            ToolType::Ffmpeg => "ffmpeg",
        }
    }

    fn version_flag(&self) -> &'static str {
        match self {
            ToolType::YtDlp => "--version",
            ToolType::Ffmpeg => "-version",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolInfo {
    pub name: String,
    pub tool_type: ToolType,
    pub version: Option<String>,
    pub path: Option<String>,
    pub is_available: bool,
}

/// Find a binary: explicit path first, then common install locations, then `PATH`
pub fn locate_binary(name: &str, configured: Option<&str>) -> Option<PathBuf> {
    if let Some(path) = configured.map(str::trim).filter(|p| !p.is_empty()) {
        let path = Path::new(path);
        // A bare directory (ffmpeg-location style) means "the binary inside it"
        let candidate = if path.is_dir() { path.join(name) } else { path.to_path_buf() };
        return candidate.exists().then_some(candidate);
    }

    let common_paths = [
        format!("/opt/homebrew/bin/{}", name),
        format!("/usr/local/bin/{}", name),
        format!("/usr/bin/{}", name),
    ];

    common_paths
        .iter()
        .map(PathBuf::from)
        .find(|p| p.exists())
        .or_else(|| which::which(name).ok())
}

/// Reports availability and versions of the external tools
pub struct ToolManager {
    ytdlp_path: Option<String>,
    ffmpeg_location: Option<String>,
}

impl ToolManager {
    pub fn new(ytdlp_path: Option<String>, ffmpeg_location: Option<String>) -> Self {
        Self {
            ytdlp_path,
            ffmpeg_location,
        }
    }

    pub fn get_tool_info(&self, tool_type: ToolType) -> ToolInfo {
        let configured = match tool_type {
            ToolType::YtDlp => self.ytdlp_path.as_deref(),
            ToolType::Ffmpeg => self.ffmpeg_location.as_deref(),
        };
        let path = locate_binary(tool_type.as_str(), configured);
        let version = path.as_deref().and_then(|p| Self::get_version(p, tool_type));

        ToolInfo {
            name: tool_type.as_str().to_string(),
            tool_type,
            version,
            is_available: path.is_some(),
            path: path.map(|p| p.to_string_lossy().into_owned()),
        }
    }

    pub fn get_all_tools(&self) -> Vec<ToolInfo> {
        vec![
            self.get_tool_info(ToolType::YtDlp),
            self.get_tool_info(ToolType::Ffmpeg),
        ]
    }

    /// First line of `--version` output; ffmpeg's is trimmed to the version token
    fn get_version(path: &Path, tool_type: ToolType) -> Option<String> {
        let output = Command::new(path).arg(tool_type.version_flag()).output().ok()?;
        if !output.status.success() {
            return None;
        }
        let stdout = String::from_utf8_lossy(&output.stdout);
        parse_version(&stdout, tool_type)
    }
}

fn parse_version(stdout: &str, tool_type: ToolType) -> Option<String> {
    let first = stdout.lines().next()?.trim();
    match tool_type {
        // "ffmpeg version 6.1.1-3ubuntu5 Copyright (c) ..."
        ToolType::Ffmpeg => first
            .strip_prefix("ffmpeg version ")
            .and_then(|rest| rest.split_whitespace().next())
            .map(str::to_string),
        ToolType::YtDlp => (!first.is_empty()).then(|| first.to_string()),
    }
}
