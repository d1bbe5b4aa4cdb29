//! yt-transcripts - batch YouTube transcript extraction from yt-dlp subtitles
//!
//! This library normalizes YouTube URLs into video identifiers, drives `yt-dlp`
//! to download VTT caption tracks, and turns them into clean plain or
//! timestamped transcripts, one result record per input URL.

pub mod cli;
pub mod config;
pub mod extractors;
pub mod input;
pub mod output;
pub mod transcribe;
pub mod utils;

pub use cli::{Cli, Commands, OutputFormat};
pub use config::Config;
pub use extractors::{CaptionTool, VideoMetadata, VideoReference};
pub use input::{RunInput, RunSettings};
pub use transcribe::{RetryPolicy, TranscriptPipeline, TranscriptResult};

/// Result type used throughout the application layer
pub type Result<T> = anyhow::Result<T>;

/// Fixed label identifying the extraction method in every output record
pub const SOURCE_LABEL: &str = "ytdlp_vtt_optimized";

/// Why a caption tool invocation failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolFailure {
    /// The executable could not be started
    Spawn,
    /// The invocation ran past its timeout and was killed
    Timeout,
    /// Non-zero exit without a more specific diagnosis
    Exit,
    /// Connection or DNS trouble reaching the video platform
    Network,
    /// The configured proxy refused or failed the connection
    Proxy,
    /// The platform throttled or challenged the request
    RateLimited,
    /// The tool reported success but produced nothing usable
    MissingOutput,
}

impl ToolFailure {
    pub fn as_str(&self) -> &'static str {
        match self {
            ToolFailure::Spawn => "spawn",
            ToolFailure::Timeout => "timeout",
            ToolFailure::Exit => "exit",
            ToolFailure::Network => "network",
            ToolFailure::Proxy => "proxy",
            ToolFailure::RateLimited => "rate_limited",
            ToolFailure::MissingOutput => "missing_output",
        }
    }
}

impl std::fmt::Display for ToolFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error types produced while turning one URL into a transcript
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum TranscriptError {
    #[error("Could not extract video ID from URL: {0}")]
    InvalidUrl(String),

    #[error("No subtitles available: {0}")]
    SubtitleUnavailable(String),

    #[error("Video unavailable: {0}")]
    VideoUnavailable(String),

    #[error("Caption tool failed ({kind}): {message}")]
    ToolInvocation { kind: ToolFailure, message: String },

    #[error("Malformed subtitle file: {0}")]
    Parse(String),
}

impl TranscriptError {
    pub fn tool(kind: ToolFailure, message: impl Into<String>) -> Self {
        Self::ToolInvocation {
            kind,
            message: message.into(),
        }
    }

    pub fn parse(message: impl Into<String>) -> Self {
        Self::Parse(message.into())
    }

    /// Whether another attempt could plausibly change the outcome
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            TranscriptError::ToolInvocation { .. } | TranscriptError::Parse(_)
        )
    }

    /// Stable machine-readable classification for output records
    pub fn kind(&self) -> &'static str {
        match self {
            TranscriptError::InvalidUrl(_) => "invalid_url",
            TranscriptError::SubtitleUnavailable(_) => "subtitle_unavailable",
            TranscriptError::VideoUnavailable(_) => "video_unavailable",
            TranscriptError::ToolInvocation { kind, .. } => match kind {
                ToolFailure::RateLimited => "rate_limited",
                ToolFailure::Network | ToolFailure::Proxy => "network",
                ToolFailure::Timeout => "timeout",
                _ => "tool_failed",
            },
            TranscriptError::Parse(_) => "parse_error",
        }
    }
}
