// Common data models for the downloader

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::errors::DownloadError;
use super::utils::sanitize_basename;

/// Codec sentinel the engine uses for "this track is absent"
pub const NO_CODEC: &str = "none";

/// One downloadable encoding variant, as classified from a probe
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StreamDescriptor {
    /// Format ID (e.g., "137", "140"), unique within one probe
    pub format_id: String,
    /// File extension (mp4, webm, m4a)
    pub container: String,
    pub video_codec: Option<String>,
    pub audio_codec: Option<String>,
    /// Resolution string (e.g., "1920x1080", "audio only")
    pub resolution: Option<String>,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub fps: Option<f32>,
    /// First present of total / video / audio bitrate, in kbps
    pub bitrate_kbps: Option<f32>,
    pub filesize_bytes: Option<u64>,
    pub filesize_approx_bytes: Option<u64>,
    /// Format note (e.g., "1080p", "medium")
    pub format_note: Option<String>,
    /// Whether this stream carries an audio track
    pub has_audio: bool,
}

impl StreamDescriptor {
    /// Get effective file size (exact or approximate)
    pub fn effective_size(&self) -> Option<u64> {
        self.filesize_bytes.or(self.filesize_approx_bytes)
    }
}

/// Result of a probe, split into video-capable and audio-only streams
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FormatCatalog {
    pub title: Option<String>,
    #[serde(rename = "duration")]
    pub duration_seconds: Option<f64>,
    pub video_formats: Vec<StreamDescriptor>,
    pub audio_formats: Vec<StreamDescriptor>,
}

impl FormatCatalog {
    /// Look up a descriptor by id in either bucket
    pub fn find(&self, format_id: &str) -> Option<&StreamDescriptor> {
        self.video_formats
            .iter()
            .chain(self.audio_formats.iter())
            .find(|d| d.format_id == format_id)
    }
}

/// Named intent shortcuts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Preset {
    BestVideoWithAudio,
    BestAudioOnly,
    BestCompatibleMp4,
}

impl Preset {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::BestVideoWithAudio => "best_video_with_audio",
            Self::BestAudioOnly => "best_audio_only",
            Self::BestCompatibleMp4 => "best_compatible_mp4",
        }
    }
}

impl fmt::Display for Preset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Preset {
    type Err = DownloadError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "best_video_with_audio" => Ok(Self::BestVideoWithAudio),
            "best_audio_only" => Ok(Self::BestAudioOnly),
            "best_compatible_mp4" => Ok(Self::BestCompatibleMp4),
            other => Err(DownloadError::InvalidIntent(format!("unknown preset '{}'", other))),
        }
    }
}

/// Target codec for audio-only downloads
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AudioCodec {
    #[default]
    Mp3,
    M4a,
    Aac,
    Opus,
    Vorbis,
    Flac,
    Wav,
    Alac,
}

impl AudioCodec {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Mp3 => "mp3",
            Self::M4a => "m4a",
            Self::Aac => "aac",
            Self::Opus => "opus",
            Self::Vorbis => "vorbis",
            Self::Flac => "flac",
            Self::Wav => "wav",
            Self::Alac => "alac",
        }
    }

    /// Extension of the file yt-dlp writes when extracting to this codec
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Aac | Self::Alac => "m4a",
            Self::Vorbis => "ogg",
            other => other.as_str(),
        }
    }
}

impl fmt::Display for AudioCodec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AudioCodec {
    type Err = DownloadError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "mp3" => Ok(Self::Mp3),
            "m4a" => Ok(Self::M4a),
            "aac" => Ok(Self::Aac),
            "opus" => Ok(Self::Opus),
            "vorbis" => Ok(Self::Vorbis),
            "flac" => Ok(Self::Flac),
            "wav" => Ok(Self::Wav),
            "alac" => Ok(Self::Alac),
            other => Err(DownloadError::InvalidIntent(format!(
                "unsupported audio codec '{}'",
                other
            ))),
        }
    }
}

/// What the user asked for: a preset, or a manual pick of format ids
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    Preset(Preset),
    Manual {
        video_format_id: Option<String>,
        audio_format_id: Option<String>,
    },
}

/// A user's download request, after validation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadIntent {
    pub target: Target,
    /// Sanitized basename for the served file, without extension
    pub output_basename: Option<String>,
    pub audio_codec: AudioCodec,
}

impl DownloadIntent {
    pub fn preset(preset: Preset) -> Self {
        Self {
            target: Target::Preset(preset),
            output_basename: None,
            audio_codec: AudioCodec::default(),
        }
    }

    pub fn manual(video_format_id: Option<&str>, audio_format_id: Option<&str>) -> Self {
        Self {
            target: Target::Manual {
                video_format_id: video_format_id.map(str::to_string),
                audio_format_id: audio_format_id.map(str::to_string),
            },
            output_basename: None,
            audio_codec: AudioCodec::default(),
        }
    }

    pub fn with_basename(mut self, basename: Option<&str>) -> Self {
        self.output_basename = basename.and_then(sanitize_basename);
        self
    }

    pub fn with_audio_codec(mut self, codec: AudioCodec) -> Self {
        self.audio_codec = codec;
        self
    }
}

/// Probe request body
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProbeRequest {
    pub url: Option<String>,
}

impl ProbeRequest {
    pub fn into_url(self) -> Result<String, DownloadError> {
        non_blank(self.url).ok_or_else(|| DownloadError::MissingInput("url".to_string()))
    }
}

/// Download request body, as sent by the UI
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DownloadRequest {
    pub url: Option<String>,
    pub preset: Option<String>,
    pub video_format_id: Option<String>,
    pub audio_format_id: Option<String>,
    #[serde(alias = "audio_format")]
    pub audio_codec: Option<String>,
    #[serde(alias = "filename")]
    pub output_basename: Option<String>,
}

impl DownloadRequest {
    /// Validate the request into a URL and an intent.
    ///
    /// A named preset takes precedence over manual ids.
    pub fn into_parts(
        self,
        default_codec: AudioCodec,
    ) -> Result<(String, DownloadIntent), DownloadError> {
        let url = non_blank(self.url).ok_or_else(|| DownloadError::MissingInput("url".to_string()))?;

        let preset = non_blank(self.preset);
        let video = non_blank(self.video_format_id);
        let audio = non_blank(self.audio_format_id);

        let target = match (preset, video, audio) {
            (Some(name), _, _) => Target::Preset(name.parse()?),
            (None, None, None) => {
                return Err(DownloadError::MissingInput(
                    "format (preset, video_format_id or audio_format_id)".to_string(),
                ))
            }
            (None, video_format_id, audio_format_id) => Target::Manual {
                video_format_id,
                audio_format_id,
            },
        };

        let audio_codec = match non_blank(self.audio_codec) {
            Some(codec) => codec.parse()?,
            None => default_codec,
        };

        let intent = DownloadIntent {
            target,
            output_basename: self.output_basename.as_deref().and_then(sanitize_basename),
            audio_codec,
        };

        Ok((url, intent))
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(json: &str) -> DownloadRequest {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_missing_url() {
        let err = request(r#"{"preset": "best_audio_only"}"#)
            .into_parts(AudioCodec::Mp3)
            .unwrap_err();
        assert!(matches!(err, DownloadError::MissingInput(_)));

        let err = request(r#"{"url": "   ", "preset": "best_audio_only"}"#)
            .into_parts(AudioCodec::Mp3)
            .unwrap_err();
        assert!(matches!(err, DownloadError::MissingInput(_)));
    }

    #[test]
    fn test_missing_format() {
        let err = request(r#"{"url": "https://example.com/v", "video_format_id": " "}"#)
            .into_parts(AudioCodec::Mp3)
            .unwrap_err();
        assert!(matches!(err, DownloadError::MissingInput(_)));
    }

    #[test]
    fn test_unknown_preset_is_invalid() {
        let err = request(r#"{"url": "https://example.com/v", "preset": "best_everything"}"#)
            .into_parts(AudioCodec::Mp3)
            .unwrap_err();
        assert!(matches!(err, DownloadError::InvalidIntent(_)));
    }

    #[test]
    fn test_preset_wins_over_manual_ids() {
        let (_, intent) = request(
            r#"{"url": "https://example.com/v", "preset": "best_audio_only", "video_format_id": "137"}"#,
        )
        .into_parts(AudioCodec::Mp3)
        .unwrap();
        assert_eq!(intent.target, Target::Preset(Preset::BestAudioOnly));
    }

    #[test]
    fn test_legacy_field_aliases() {
        let (url, intent) = request(
            r#"{"url": " https://example.com/v ", "audio_format_id": "140", "audio_format": "OPUS", "filename": "my/song"}"#,
        )
        .into_parts(AudioCodec::Mp3)
        .unwrap();
        assert_eq!(url, "https://example.com/v");
        assert_eq!(intent.audio_codec, AudioCodec::Opus);
        assert_eq!(intent.output_basename.as_deref(), Some("my_song"));
        assert_eq!(
            intent.target,
            Target::Manual {
                video_format_id: None,
                audio_format_id: Some("140".to_string()),
            }
        );
    }

    #[test]
    fn test_default_codec_and_bad_codec() {
        let (_, intent) = request(r#"{"url": "u", "preset": "best_audio_only"}"#)
            .into_parts(AudioCodec::Flac)
            .unwrap();
        assert_eq!(intent.audio_codec, AudioCodec::Flac);

        let err = request(r#"{"url": "u", "preset": "best_audio_only", "audio_codec": "mp9"}"#)
            .into_parts(AudioCodec::Mp3)
            .unwrap_err();
        assert!(matches!(err, DownloadError::InvalidIntent(_)));
    }

    #[test]
    fn test_codec_extensions_follow_extracted_file() {
        let cases = [
            (AudioCodec::Mp3, "mp3"),
            (AudioCodec::M4a, "m4a"),
            (AudioCodec::Aac, "m4a"),
            (AudioCodec::Opus, "opus"),
            (AudioCodec::Vorbis, "ogg"),
            (AudioCodec::Flac, "flac"),
            (AudioCodec::Wav, "wav"),
            (AudioCodec::Alac, "m4a"),
        ];
        for (codec, ext) in cases {
            assert_eq!(codec.extension(), ext, "{codec}");
        }
    }

    #[test]
    fn test_catalog_find() {
        let catalog = FormatCatalog {
            title: None,
            duration_seconds: None,
            video_formats: Vec::new(),
            audio_formats: vec![StreamDescriptor {
                format_id: "140".into(),
                container: "m4a".into(),
                video_codec: None,
                audio_codec: Some("mp4a.40.2".into()),
                resolution: None,
                width: None,
                height: None,
                fps: None,
                bitrate_kbps: Some(129.5),
                filesize_bytes: None,
                filesize_approx_bytes: Some(3_000_000),
                format_note: None,
                has_audio: true,
            }],
        };
        assert_eq!(catalog.find("140").and_then(|d| d.effective_size()), Some(3_000_000));
        assert!(catalog.find("137").is_none());
    }
}
