// Format classifier - splits raw probe formats into video and audio buckets

use super::extractors::{ProbeResult, RawFormat};
use super::models::{FormatCatalog, StreamDescriptor, NO_CODEC};

fn is_real_codec(codec: Option<&str>) -> bool {
    codec.is_some_and(|c| !c.is_empty() && c != NO_CODEC)
}

/// Split formats into (video, audio-only), preserving order within each bucket.
///
/// Anything with a real video codec is video, with `has_audio` telling whether
/// it also carries sound. Records with neither codec are dropped.
pub fn classify(formats: &[RawFormat]) -> (Vec<StreamDescriptor>, Vec<StreamDescriptor>) {
    let mut video_formats = Vec::new();
    let mut audio_formats = Vec::new();

    for raw in formats {
        let has_video = is_real_codec(raw.vcodec.as_deref());
        let has_audio = is_real_codec(raw.acodec.as_deref());

        if has_video {
            video_formats.push(describe(raw, has_audio));
        } else if has_audio {
            audio_formats.push(describe(raw, true));
        }
    }

    (video_formats, audio_formats)
}

/// Build a catalog from a full probe result
pub fn catalog_from_probe(probe: ProbeResult) -> FormatCatalog {
    let (video_formats, audio_formats) = classify(&probe.formats);
    FormatCatalog {
        title: probe.title,
        duration_seconds: probe.duration_seconds,
        video_formats,
        audio_formats,
    }
}

fn describe(raw: &RawFormat, has_audio: bool) -> StreamDescriptor {
    StreamDescriptor {
        format_id: raw.format_id.clone(),
        container: raw.ext.clone(),
        video_codec: raw.vcodec.clone(),
        audio_codec: raw.acodec.clone(),
        resolution: raw.resolution.clone(),
        width: raw.width,
        height: raw.height,
        fps: raw.fps,
        bitrate_kbps: raw.tbr.or(raw.vbr).or(raw.abr),
        filesize_bytes: raw.filesize,
        filesize_approx_bytes: raw.filesize_approx,
        format_note: raw.format_note.clone(),
        has_audio,
    }
}
