// FormatSelector - turns a download intent into a selector and post-processing plan
//
// Decision table, in priority order:
// - Preset                -> fixed fallback chain
// - Manual video + audio  -> "{video}+{audio}"
// - Manual audio only     -> "{audio}", extract to the target codec
// - Manual video only     -> "{video}" if it already has sound,
//                            otherwise force-attach the best audio
// - Nothing selected      -> InvalidIntent

use async_trait::async_trait;
use serde::Serialize;

use super::errors::DownloadError;
use super::expression::{Choice, SelectorExpr, StreamRef, TrackKind};
use super::models::{AudioCodec, DownloadIntent, FormatCatalog, Preset, Target};

/// Container every video result is normalized to
pub const VIDEO_CONTAINER: &str = "mp4";

/// Audio extraction quality, CBR-equivalent kbps
pub const AUDIO_QUALITY_KBPS: u32 = 192;

/// Post-processing steps handed to the engine (and through it, ffmpeg)
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "step", rename_all = "snake_case")]
pub enum PostProcessStep {
    /// Extract/transcode the audio track to `codec`
    ExtractAudio { codec: AudioCodec, quality_kbps: u32 },
    /// Repackage the result into `container` without re-encoding
    RemuxVideo { container: String },
    /// Write title/uploader/etc. into the container
    EmbedMetadata,
}

/// Everything the engine needs to know to produce the file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedPlan {
    pub expression: SelectorExpr,
    pub is_audio_only: bool,
    /// Container for merging two-stream results, applied by the engine itself
    pub merge_output_format: Option<String>,
    pub post_processing: Vec<PostProcessStep>,
    pub audio_codec: AudioCodec,
}

impl ResolvedPlan {
    /// The selector string in the engine's grammar
    pub fn format_selector(&self) -> String {
        self.expression.to_string()
    }

    /// Extension of the file this plan produces
    pub fn output_extension(&self) -> &str {
        if self.is_audio_only {
            self.audio_codec.extension()
        } else {
            VIDEO_CONTAINER
        }
    }
}

/// Narrow capability: does this format id already carry audio?
#[async_trait]
pub trait AudioLookup: Send + Sync {
    async fn has_audio(&self, format_id: &str) -> Result<bool, DownloadError>;
}

#[async_trait]
impl AudioLookup for FormatCatalog {
    async fn has_audio(&self, format_id: &str) -> Result<bool, DownloadError> {
        Ok(self.find(format_id).is_some_and(|d| d.has_audio))
    }
}

/// The user's target, reduced to one row of the decision table
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selection {
    Preset(Preset),
    Pair { video: StreamRef, audio: StreamRef },
    AudioOnly(StreamRef),
    VideoOnly(StreamRef),
}

impl Selection {
    pub fn from_target(target: &Target) -> Result<Self, DownloadError> {
        match target {
            Target::Preset(preset) => Ok(Self::Preset(*preset)),
            Target::Manual {
                video_format_id,
                audio_format_id,
            } => match (video_format_id.as_deref(), audio_format_id.as_deref()) {
                (Some(video), Some(audio)) => Ok(Self::Pair {
                    video: StreamRef::id(video)?,
                    audio: StreamRef::id(audio)?,
                }),
                (None, Some(audio)) => Ok(Self::AudioOnly(StreamRef::id(audio)?)),
                (Some(video), None) => Ok(Self::VideoOnly(StreamRef::id(video)?)),
                (None, None) => Err(DownloadError::InvalidIntent(
                    "choose a preset, a video format or an audio format".to_string(),
                )),
            },
        }
    }

    pub fn is_audio_only(&self) -> bool {
        matches!(self, Self::Preset(Preset::BestAudioOnly) | Self::AudioOnly(_))
    }
}

/// Resolver entry points
pub struct FormatSelector;

impl FormatSelector {
    /// Resolve an intent into a plan.
    ///
    /// `lookup` is consulted only for a lone video pick. If the lookup fails the
    /// stream is treated as silent, so audio gets attached.
    pub async fn resolve(
        intent: &DownloadIntent,
        lookup: &dyn AudioLookup,
    ) -> Result<ResolvedPlan, DownloadError> {
        let selection = Selection::from_target(&intent.target)?;

        let video_has_audio = match &selection {
            Selection::VideoOnly(StreamRef::Id(id)) => match lookup.has_audio(id).await {
                Ok(has_audio) => has_audio,
                Err(e) => {
                    tracing::warn!(format_id = %id, error = %e, "audio check failed, assuming no audio");
                    false
                }
            },
            _ => false,
        };

        let plan = Self::plan(&selection, video_has_audio, intent.audio_codec);
        tracing::debug!(
            selector = %plan.expression,
            audio_only = plan.is_audio_only,
            merge = plan.expression.prefers_merge(),
            "resolved download plan"
        );
        Ok(plan)
    }

    /// Pure part of the resolver: selection + audio verdict -> plan
    pub fn plan(selection: &Selection, video_has_audio: bool, audio_codec: AudioCodec) -> ResolvedPlan {
        let expression = match selection {
            Selection::Preset(preset) => Self::preset_expression(*preset),
            Selection::Pair { video, audio } => {
                SelectorExpr::new(Choice::Merge(video.clone(), audio.clone()))
            }
            Selection::AudioOnly(audio) => SelectorExpr::new(Choice::Single(audio.clone())),
            Selection::VideoOnly(video) if video_has_audio => {
                SelectorExpr::new(Choice::Single(video.clone()))
            }
            Selection::VideoOnly(video) => SelectorExpr::new(Choice::Merge(
                video.clone(),
                StreamRef::best(TrackKind::Audio),
            ))
            .or(Choice::Single(StreamRef::best_mixed(TrackKind::Audio))),
        };

        if selection.is_audio_only() {
            ResolvedPlan {
                expression,
                is_audio_only: true,
                merge_output_format: None,
                post_processing: vec![PostProcessStep::ExtractAudio {
                    codec: audio_codec,
                    quality_kbps: AUDIO_QUALITY_KBPS,
                }],
                audio_codec,
            }
        } else {
            ResolvedPlan {
                expression,
                is_audio_only: false,
                merge_output_format: Some(VIDEO_CONTAINER.to_string()),
                post_processing: vec![
                    PostProcessStep::RemuxVideo {
                        container: VIDEO_CONTAINER.to_string(),
                    },
                    PostProcessStep::EmbedMetadata,
                ],
                audio_codec,
            }
        }
    }

    /// Fallback chain for each preset: compatible containers first, then anything playable
    pub fn preset_expression(preset: Preset) -> SelectorExpr {
        let compatible_pair = Choice::Merge(
            StreamRef::best_in(TrackKind::Video, VIDEO_CONTAINER),
            StreamRef::best_in(TrackKind::Audio, "m4a"),
        );
        let best_any = Choice::Single(StreamRef::best(TrackKind::Any));

        match preset {
            Preset::BestVideoWithAudio => SelectorExpr::new(compatible_pair)
                .or(Choice::Merge(
                    StreamRef::best(TrackKind::Video),
                    StreamRef::best(TrackKind::Audio),
                ))
                .or(best_any),
            Preset::BestAudioOnly => {
                SelectorExpr::new(Choice::Single(StreamRef::best(TrackKind::Audio))).or(best_any)
            }
            Preset::BestCompatibleMp4 => SelectorExpr::new(compatible_pair)
                .or(Choice::Single(StreamRef::best_in(TrackKind::Any, VIDEO_CONTAINER)))
                .or(best_any),
        }
    }
}
