use regex::Regex;
use std::sync::LazyLock;

use crate::TranscriptError;

/// Length of every YouTube video identifier
pub const VIDEO_ID_LEN: usize = 11;

/// Known URL shapes; the first capture group is the candidate identifier.
///
/// Candidates are captured greedily and length-checked afterwards so that
/// `watch?v=invalid!!` is rejected instead of matching a prefix.
static URL_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        // youtube.com/watch?v=<id>, with v anywhere in the query
        r"^(?:https?://)?(?i:(?:www\.|m\.|music\.)?youtube\.com)/watch/?\?(?:[^#\s]*&)?v=([A-Za-z0-9_-]+)",
        // youtu.be/<id>
        r"^(?:https?://)?(?i:(?:www\.)?youtu\.be)/([A-Za-z0-9_-]+)",
        // youtube.com/shorts/<id>
        r"^(?:https?://)?(?i:(?:www\.|m\.)?youtube\.com)/shorts/([A-Za-z0-9_-]+)",
        // youtube.com/embed/<id>, including the privacy-enhanced host
        r"^(?:https?://)?(?i:(?:www\.)?youtube(?:-nocookie)?\.com)/embed/([A-Za-z0-9_-]+)",
    ]
    .iter()
    .map(|pattern| Regex::new(pattern).unwrap())
    .collect()
});

/// A validated YouTube video identifier and the URL it came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoReference {
    id: String,
    source_url: String,
}

impl VideoReference {
    /// Extract the video identifier from a YouTube URL
    pub fn parse(url: &str) -> Result<Self, TranscriptError> {
        let id = extract_video_id(url)?;
        Ok(Self {
            id,
            source_url: url.to_string(),
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// The URL exactly as supplied by the caller
    pub fn source_url(&self) -> &str {
        &self.source_url
    }

    /// Canonical watch URL handed to the caption tool
    pub fn watch_url(&self) -> String {
        format!("https://www.youtube.com/watch?v={}", self.id)
    }
}

impl std::fmt::Display for VideoReference {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.id)
    }
}

/// Extract the 11-character video identifier from any recognized URL form
pub fn extract_video_id(url: &str) -> Result<String, TranscriptError> {
    let input = url.trim();

    let candidate = URL_PATTERNS
        .iter()
        .find_map(|pattern| pattern.captures(input))
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
        .ok_or_else(|| TranscriptError::InvalidUrl(url.to_string()))?;

    if !is_valid_video_id(candidate) {
        return Err(TranscriptError::InvalidUrl(url.to_string()));
    }

    Ok(candidate.to_string())
}

/// Check the fixed length and the `[A-Za-z0-9_-]` alphabet
pub fn is_valid_video_id(candidate: &str) -> bool {
    candidate.len() == VIDEO_ID_LEN
        && candidate
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_'))
}
