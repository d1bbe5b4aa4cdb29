use async_trait::async_trait;
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

pub mod video_id;
pub mod youtube;

pub use video_id::{extract_video_id, VideoReference};
pub use youtube::YtDlpTool;

use crate::TranscriptError;

/// Video metadata as reported by the caption tool's JSON dump
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VideoMetadata {
    #[serde(default)]
    pub title: Option<String>,

    /// Spoken language detected by the platform, if any
    #[serde(default)]
    pub language: Option<String>,

    /// Manually authored subtitle tracks keyed by language code
    #[serde(default, deserialize_with = "null_as_empty")]
    pub subtitles: BTreeMap<String, serde_json::Value>,

    /// Auto-generated caption tracks keyed by language code
    #[serde(default, deserialize_with = "null_as_empty")]
    pub automatic_captions: BTreeMap<String, serde_json::Value>,
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<BTreeMap<String, serde_json::Value>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<BTreeMap<String, serde_json::Value>>::deserialize(deserializer)?.unwrap_or_default())
}

impl VideoMetadata {
    pub fn has_any_track(&self) -> bool {
        !self.subtitles.is_empty() || !self.automatic_captions.is_empty()
    }
}

/// Which kind of caption track to download
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackKind {
    Manual,
    Auto,
}

impl TrackKind {
    /// yt-dlp flag that writes only this kind of track
    pub fn tool_flag(&self) -> &'static str {
        match self {
            TrackKind::Manual => "--write-subs",
            TrackKind::Auto => "--write-auto-subs",
        }
    }
}

impl std::fmt::Display for TrackKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TrackKind::Manual => write!(f, "manual"),
            TrackKind::Auto => write!(f, "auto"),
        }
    }
}

/// A concrete caption track chosen from the metadata listing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackSelection {
    /// Track key exactly as listed by the tool (e.g. `en`, `en-US`, `en-orig`)
    pub code: String,
    pub kind: TrackKind,
}

impl TrackSelection {
    /// Language code for reporting, without yt-dlp's `-orig` marker
    pub fn language(&self) -> &str {
        self.code.strip_suffix("-orig").unwrap_or(&self.code)
    }
}

/// Everything the tool needs to probe a video
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeRequest {
    pub video_id: String,
    pub url: String,
    pub proxy: Option<String>,
}

/// Everything the tool needs to download one caption track
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadRequest {
    pub video_id: String,
    pub url: String,
    pub track: TrackSelection,
    pub proxy: Option<String>,
    pub output_dir: PathBuf,
}

/// External caption tool seam
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CaptionTool: Send + Sync {
    /// Fetch metadata and the list of available caption tracks
    async fn probe(&self, request: &ProbeRequest) -> Result<VideoMetadata, TranscriptError>;

    /// Download one caption track as WebVTT into `request.output_dir`
    async fn download(&self, request: &DownloadRequest) -> Result<(), TranscriptError>;

    /// Get the name of this tool
    fn tool_name(&self) -> &'static str;
}

/// Keys that yt-dlp lists next to real caption tracks but that hold no captions
const NON_CAPTION_TRACKS: &[&str] = &["live_chat"];

/// Whether a listed track can be fetched as WebVTT.
///
/// An empty format list is accepted; the download step reports a missing file.
fn is_caption_track(code: &str, formats: &serde_json::Value) -> bool {
    if NON_CAPTION_TRACKS.contains(&code) {
        return false;
    }

    match formats.as_array() {
        Some(formats) if !formats.is_empty() => formats
            .iter()
            .any(|format| format.get("ext").and_then(|ext| ext.as_str()) == Some("vtt")),
        _ => true,
    }
}

/// Pick the caption track to download.
///
/// With `prefer_manual` the manual tracks are searched first and the
/// auto-generated captions are the fallback; without it the order flips.
/// Without a requested language, a track in the detected spoken language of
/// either kind beats any track in another language.
pub fn select_track(
    metadata: &VideoMetadata,
    language: Option<&str>,
    prefer_manual: bool,
) -> Option<TrackSelection> {
    let order = if prefer_manual {
        [TrackKind::Manual, TrackKind::Auto]
    } else {
        [TrackKind::Auto, TrackKind::Manual]
    };

    if let Some(requested) = language {
        return find_in_order(metadata, order, |codes| match_requested(codes, requested));
    }

    if let Some(detected) = metadata.language.as_deref() {
        if let Some(track) = find_in_order(metadata, order, |codes| match_requested(codes, detected)) {
            return Some(track);
        }
    }

    // Auto captions list every translation; the spoken language carries `-orig`
    find_in_order(metadata, order, |codes| {
        codes.iter().find(|code| code.ends_with("-orig")).map(|code| code.to_string())
    })
    .or_else(|| {
        find_in_order(metadata, order, |codes| {
            codes.iter().find(|code| **code == "en").map(|code| code.to_string())
        })
    })
    .or_else(|| find_in_order(metadata, order, |codes| codes.first().map(|code| code.to_string())))
}

/// Caption track codes of one kind, in listing order
fn caption_codes(metadata: &VideoMetadata, kind: TrackKind) -> Vec<&str> {
    let tracks = match kind {
        TrackKind::Manual => &metadata.subtitles,
        TrackKind::Auto => &metadata.automatic_captions,
    };

    tracks
        .iter()
        .filter(|(code, formats)| is_caption_track(code, formats))
        .map(|(code, _)| code.as_str())
        .collect()
}

fn find_in_order<F>(metadata: &VideoMetadata, order: [TrackKind; 2], matcher: F) -> Option<TrackSelection>
where
    F: Fn(&[&str]) -> Option<String>,
{
    order.into_iter().find_map(|kind| {
        matcher(&caption_codes(metadata, kind)).map(|code| TrackSelection { code, kind })
    })
}

fn match_requested(codes: &[&str], requested: &str) -> Option<String> {
    let prefix = format!("{requested}-");
    codes
        .iter()
        .find(|code| code.eq_ignore_ascii_case(requested))
        .or_else(|| codes.iter().find(|code| code.starts_with(&prefix)))
        .map(|code| code.to_string())
}
