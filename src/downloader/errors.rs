// Error types for the probe / resolve / fetch pipeline

use super::extractors::diagnostics::{diagnose_error, BlockingReason};
use super::utils::extract_error_line;

#[derive(Debug, thiserror::Error)]
pub enum DownloadError {
    /// A required request field is absent (no URL, no format choice)
    #[error("Missing input: {0}")]
    MissingInput(String),

    /// The request names something the resolver cannot turn into a selector
    #[error("Invalid selection: {0}")]
    InvalidIntent(String),

    /// The extraction engine reported a failure (unsupported site, network, geo-block...)
    #[error("Extraction failed: {message}")]
    ExtractionFailed {
        message: String,
        reason: BlockingReason,
    },

    /// The engine exited successfully but left nothing in the workspace
    #[error("No file produced - download may have failed")]
    NoArtifactProduced,

    /// yt-dlp (or another required binary) could not be started
    #[error("Tool not found: {0}")]
    ToolNotFound(String),

    /// Engine output could not be understood
    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl DownloadError {
    /// Build an `ExtractionFailed` from raw engine stderr.
    ///
    /// The user-facing message is the engine's `ERROR:` line when there is one;
    /// the full text is still used to diagnose the reason.
    pub fn from_engine_output(stderr: &str) -> Self {
        let message = extract_error_line(stderr)
            .unwrap_or_else(|| "extraction engine exited with an error".to_string());
        Self::ExtractionFailed {
            message,
            reason: diagnose_error(stderr).unwrap_or(BlockingReason::Unknown),
        }
    }

    /// Engine invocation exceeded its time budget and was killed.
    pub fn timed_out(secs: u64) -> Self {
        Self::ExtractionFailed {
            message: format!("Timed out after {}s", secs),
            reason: BlockingReason::NetworkTimeout,
        }
    }

    /// Short machine-readable name, used in API error bodies
    pub fn kind(&self) -> &'static str {
        match self {
            Self::MissingInput(_) => "missing_input",
            Self::InvalidIntent(_) => "invalid_intent",
            Self::ExtractionFailed { .. } => "extraction_failed",
            Self::NoArtifactProduced => "no_artifact_produced",
            Self::ToolNotFound(_) => "tool_not_found",
            Self::ParseError(_) => "parse_error",
            Self::Io(_) => "io",
        }
    }

    /// Diagnosed cause of an engine failure
    pub fn reason(&self) -> Option<BlockingReason> {
        match self {
            Self::ExtractionFailed { reason, .. } => Some(*reason),
            _ => None,
        }
    }

    /// Whether the caller sent something unusable (as opposed to a server-side failure)
    pub fn is_client_error(&self) -> bool {
        matches!(self, Self::MissingInput(_) | Self::InvalidIntent(_))
    }

    /// Actionable hint for the user, when the failure has a known cause
    pub fn hint(&self) -> Option<&'static str> {
        match self {
            Self::ExtractionFailed { reason, .. } => reason.hint(),
            Self::ToolNotFound(_) => Some("Install yt-dlp and ffmpeg, or set their paths in the [engine] config section."),
            Self::NoArtifactProduced => Some("The site may have served an empty stream; try a different format."),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_engine_output_keeps_error_line() {
        let stderr = "[youtube] abc: Downloading webpage\n\
                      ERROR: [youtube] abc: Video unavailable. This video is private\n";
        match DownloadError::from_engine_output(stderr) {
            DownloadError::ExtractionFailed { message, reason } => {
                assert_eq!(message, "Video unavailable. This video is private");
                assert_eq!(reason, BlockingReason::PrivateVideo);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_engine_output_without_error_line() {
        let err = DownloadError::from_engine_output("");
        assert_eq!(err.kind(), "extraction_failed");
        assert!(err.to_string().contains("exited with an error"));
    }

    #[test]
    fn test_client_errors() {
        assert!(DownloadError::MissingInput("url".into()).is_client_error());
        assert!(DownloadError::InvalidIntent("x".into()).is_client_error());
        assert!(!DownloadError::NoArtifactProduced.is_client_error());
        assert!(!DownloadError::timed_out(5).is_client_error());
    }

    #[test]
    fn test_reason_only_for_engine_failures() {
        assert_eq!(
            DownloadError::timed_out(5).reason(),
            Some(BlockingReason::NetworkTimeout)
        );
        assert_eq!(DownloadError::NoArtifactProduced.reason(), None);
    }

    #[test]
    fn test_timeout_has_hint() {
        let err = DownloadError::timed_out(30);
        assert_eq!(err.to_string(), "Extraction failed: Timed out after 30s");
        assert!(err.hint().is_some());
    }
}
