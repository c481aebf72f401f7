// Failure diagnostics - classifies extraction engine errors
//
// Analyzes yt-dlp stderr to determine:
// - Why the site refused or the engine gave up
// - What the user could try next

use serde::{Deserialize, Serialize};

/// Reasons an extraction or fetch can fail
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlockingReason {
    /// No extractor handles this URL
    UnsupportedUrl,

    /// The picked format id does not exist for this media
    FormatUnavailable,

    /// DRM-protected content, cannot be fetched at all
    DrmProtected,

    /// Age-restricted content requiring login
    AgeRestricted,

    /// Private media requiring authorization
    PrivateVideo,

    /// Media deleted or otherwise unavailable
    VideoUnavailable,

    /// Geographic restriction
    GeoBlocked,

    /// Rate limiting (429 or similar)
    RateLimited,

    /// HTTP 403 Forbidden
    Http403Forbidden,

    /// Network timeout or unreachable host
    NetworkTimeout,

    /// Generic/unknown failure
    Unknown,
}

impl BlockingReason {
    /// Check if this is a permanent restriction (no workaround)
    pub fn is_permanent(&self) -> bool {
        matches!(
            self,
            Self::DrmProtected | Self::VideoUnavailable | Self::UnsupportedUrl
        )
    }

    /// Human-readable description
    pub fn description(&self) -> &'static str {
        match self {
            Self::UnsupportedUrl => "Unsupported URL",
            Self::FormatUnavailable => "Requested format is not available",
            Self::DrmProtected => "DRM-protected content",
            Self::AgeRestricted => "Age-restricted content",
            Self::PrivateVideo => "Private video",
            Self::VideoUnavailable => "Video unavailable",
            Self::GeoBlocked => "Geographic restriction",
            Self::RateLimited => "Rate limited by the site",
            Self::Http403Forbidden => "Access denied (HTTP 403)",
            Self::NetworkTimeout => "Network timeout",
            Self::Unknown => "Unknown failure",
        }
    }

    /// What the user can try next
    pub fn hint(&self) -> Option<&'static str> {
        match self {
            Self::UnsupportedUrl => Some("Check the URL; this site is not supported by the extractor."),
            Self::FormatUnavailable => Some("Probe the URL again and pick one of the listed formats."),
            Self::DrmProtected => Some("DRM-protected media cannot be downloaded as a file."),
            Self::AgeRestricted | Self::PrivateVideo => {
                Some("Configure a cookies file from a logged-in browser (engine.cookies_path).")
            }
            Self::VideoUnavailable => Some("The media may have been removed or made private."),
            Self::GeoBlocked => Some("Use a proxy in an allowed region (engine.proxy)."),
            Self::RateLimited => Some("Wait a few minutes before trying again."),
            Self::Http403Forbidden => Some("Update yt-dlp, or try again through a proxy."),
            Self::NetworkTimeout => Some("Check the network connection and try again."),
            Self::Unknown => None,
        }
    }
}

/// Analyze error message and return the failure reason
pub fn diagnose_error(error: &str) -> Option<BlockingReason> {
    if error.trim().is_empty() {
        return None;
    }

    let lower = error.to_lowercase();

    // Check patterns in order of specificity

    if lower.contains("unsupported url") || lower.contains("is not a valid url") {
        return Some(BlockingReason::UnsupportedUrl);
    }

    if lower.contains("requested format is not available")
        || lower.contains("requested formats are incompatible")
    {
        return Some(BlockingReason::FormatUnavailable);
    }

    if lower.contains("drm") || lower.contains("widevine") || lower.contains("encrypted media") {
        return Some(BlockingReason::DrmProtected);
    }

    if lower.contains("age-restricted")
        || lower.contains("sign in to confirm your age")
        || lower.contains("age_verification")
    {
        return Some(BlockingReason::AgeRestricted);
    }

    if lower.contains("private video") || lower.contains("video is private") {
        return Some(BlockingReason::PrivateVideo);
    }

    if lower.contains("video unavailable")
        || lower.contains("has been removed")
        || lower.contains("no longer available")
    {
        return Some(BlockingReason::VideoUnavailable);
    }

    if lower.contains("available in your country")
        || lower.contains("blocked in your country")
        || lower.contains("geo restrict")
        || lower.contains("geo-restrict")
    {
        return Some(BlockingReason::GeoBlocked);
    }

    if lower.contains("429") || lower.contains("rate limit") || lower.contains("too many requests") {
        return Some(BlockingReason::RateLimited);
    }

    if lower.contains("403") || lower.contains("forbidden") {
        return Some(BlockingReason::Http403Forbidden);
    }

    if lower.contains("timeout")
        || lower.contains("timed out")
        || lower.contains("connection refused")
        || lower.contains("network is unreachable")
        || lower.contains("name or service not known")
    {
        return Some(BlockingReason::NetworkTimeout);
    }

    Some(BlockingReason::Unknown)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unsupported_url_detection() {
        let error = "ERROR: Unsupported URL: https://example.com/page";
        assert_eq!(diagnose_error(error), Some(BlockingReason::UnsupportedUrl));
    }

    #[test]
    fn test_format_unavailable_detection() {
        let error = "ERROR: [youtube] abc: Requested format is not available. Use --list-formats";
        assert_eq!(diagnose_error(error), Some(BlockingReason::FormatUnavailable));
    }

    #[test]
    fn test_geo_detection() {
        let error = "The uploader has not made this video available in your country";
        assert_eq!(diagnose_error(error), Some(BlockingReason::GeoBlocked));
    }

    #[test]
    fn test_403_detection() {
        let error = "ERROR: unable to download video data: HTTP Error 403: Forbidden";
        assert_eq!(diagnose_error(error), Some(BlockingReason::Http403Forbidden));
    }

    #[test]
    fn test_timeout_detection() {
        assert_eq!(
            diagnose_error("Timed out after 30s"),
            Some(BlockingReason::NetworkTimeout)
        );
    }

    #[test]
    fn test_empty_is_none() {
        assert_eq!(diagnose_error("   "), None);
        assert_eq!(diagnose_error("something odd"), Some(BlockingReason::Unknown));
    }

    #[test]
    fn test_permanent() {
        assert!(BlockingReason::DrmProtected.is_permanent());
        assert!(BlockingReason::UnsupportedUrl.is_permanent());
        assert!(!BlockingReason::RateLimited.is_permanent());
        assert!(BlockingReason::Unknown.hint().is_none());
    }
}
