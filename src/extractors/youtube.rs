use async_trait::async_trait;
use std::process::{Output, Stdio};
use std::time::{Duration, Instant};
use tokio::process::Command;

use super::{CaptionTool, DownloadRequest, ProbeRequest, VideoMetadata};
use crate::config::ToolConfig;
use crate::{ToolFailure, TranscriptError};

/// Captured result of one finished tool invocation
#[derive(Debug)]
pub struct ToolOutput {
    pub output: Output,
    pub elapsed: Duration,
}

impl ToolOutput {
    pub fn stderr(&self) -> String {
        String::from_utf8_lossy(&self.output.stderr).into_owned()
    }
}

/// Caption downloader backed by the yt-dlp executable
pub struct YtDlpTool {
    yt_dlp_path: String,
    timeout: Duration,
    extra_args: Vec<String>,
}

impl YtDlpTool {
    pub fn new() -> Self {
        Self::from_config(&ToolConfig::default())
    }

    pub fn from_config(config: &ToolConfig) -> Self {
        Self {
            yt_dlp_path: config.yt_dlp_path.clone(),
            timeout: config.timeout(),
            extra_args: config.extra_args.clone(),
        }
    }

    /// Check if yt-dlp is available
    pub async fn check_availability(&self) -> bool {
        Command::new(&self.yt_dlp_path)
            .arg("--version")
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await
            .map(|output| output.status.success())
            .unwrap_or(false)
    }

    /// Arguments for the metadata probe
    pub fn probe_args(&self, request: &ProbeRequest) -> Vec<String> {
        let mut args: Vec<String> = [
            "--skip-download",
            "--dump-single-json",
            "--no-playlist",
            "--no-warnings",
        ]
        .iter()
        .map(|s| s.to_string())
        .collect();

        self.push_common_args(&mut args, request.proxy.as_deref());
        args.push(request.url.clone());
        args
    }

    /// Arguments for a subtitle-only download of the selected track
    pub fn download_args(&self, request: &DownloadRequest) -> Vec<String> {
        let template = request.output_dir.join("%(title)s.%(ext)s");

        let mut args: Vec<String> = vec![
            "--skip-download".to_string(),
            request.track.kind.tool_flag().to_string(),
            "--sub-langs".to_string(),
            request.track.code.clone(),
            "--sub-format".to_string(),
            "vtt".to_string(),
            "--no-playlist".to_string(),
            "--quiet".to_string(),
            "--no-warnings".to_string(),
            "-o".to_string(),
            template.to_string_lossy().into_owned(),
        ];

        self.push_common_args(&mut args, request.proxy.as_deref());
        args.push(request.url.clone());
        args
    }

    fn push_common_args(&self, args: &mut Vec<String>, proxy: Option<&str>) {
        if let Some(proxy) = proxy {
            args.push("--proxy".to_string());
            args.push(proxy.to_string());
        }
        args.extend(self.extra_args.iter().cloned());
    }

    /// Run yt-dlp under the configured timeout.
    ///
    /// The child is spawned with `kill_on_drop`, so a timeout or a cancelled
    /// caller kills the process instead of leaving it running.
    async fn run(&self, args: &[String]) -> Result<ToolOutput, TranscriptError> {
        tracing::debug!("Running: {} {}", self.yt_dlp_path, args.join(" "));

        let started = Instant::now();
        let child = Command::new(&self.yt_dlp_path)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                TranscriptError::tool(
                    ToolFailure::Spawn,
                    format!("could not start {}: {}", self.yt_dlp_path, e),
                )
            })?;

        let output = match tokio::time::timeout(self.timeout, child.wait_with_output()).await {
            Ok(result) => result.map_err(|e| {
                TranscriptError::tool(ToolFailure::Exit, format!("failed to wait for yt-dlp: {e}"))
            })?,
            Err(_) => {
                tracing::warn!(
                    "yt-dlp timed out after {} seconds, killing process",
                    self.timeout.as_secs()
                );
                return Err(TranscriptError::tool(
                    ToolFailure::Timeout,
                    format!("yt-dlp timed out after {} seconds", self.timeout.as_secs()),
                ));
            }
        };

        let tool_output = ToolOutput {
            output,
            elapsed: started.elapsed(),
        };
        tracing::debug!(
            exit_code = ?tool_output.output.status.code(),
            elapsed_ms = tool_output.elapsed.as_millis() as u64,
            "yt-dlp finished"
        );

        if !tool_output.output.status.success() {
            return Err(classify_failure(
                &tool_output.stderr(),
                tool_output.output.status.code(),
            ));
        }

        Ok(tool_output)
    }
}

#[async_trait]
impl CaptionTool for YtDlpTool {
    async fn probe(&self, request: &ProbeRequest) -> Result<VideoMetadata, TranscriptError> {
        tracing::debug!("Extracting video info for: {}", request.video_id);

        let tool_output = self.run(&self.probe_args(request)).await?;

        serde_json::from_slice(&tool_output.output.stdout).map_err(|e| {
            TranscriptError::tool(
                ToolFailure::MissingOutput,
                format!("yt-dlp metadata was not valid JSON: {e}"),
            )
        })
    }

    async fn download(&self, request: &DownloadRequest) -> Result<(), TranscriptError> {
        tracing::debug!(
            "Downloading {} subtitles ({}) for: {}",
            request.track.kind,
            request.track.code,
            request.video_id
        );

        self.run(&self.download_args(request)).await?;
        Ok(())
    }

    fn tool_name(&self) -> &'static str {
        "yt-dlp"
    }
}

impl Default for YtDlpTool {
    fn default() -> Self {
        Self::new()
    }
}

const RATE_LIMIT_MARKERS: &[&str] = &[
    "HTTP Error 429",
    "Too Many Requests",
    "rate limit",
    "confirm you're not a bot",
    "confirm you’re not a bot",
];

const UNAVAILABLE_MARKERS: &[&str] = &[
    "Video unavailable",
    "Private video",
    "This video has been removed",
    "This video is not available",
    "Incomplete YouTube ID",
    "members-only content",
    "Sign in to confirm your age",
    "age-restricted",
];

const PROXY_MARKERS: &[&str] = &[
    "Unable to connect to proxy",
    "ProxyError",
    "Tunnel connection failed",
    "407 Proxy Authentication Required",
];

const NETWORK_MARKERS: &[&str] = &[
    "Unable to download webpage",
    "Unable to download API page",
    "timed out",
    "Connection refused",
    "Connection reset",
    "Name or service not known",
    "Temporary failure in name resolution",
    "urlopen error",
];

/// Map a failed yt-dlp run to an error kind from its stderr
pub fn classify_failure(stderr: &str, exit_code: Option<i32>) -> TranscriptError {
    let message = stderr
        .lines()
        .rev()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| match exit_code {
            Some(code) => format!("yt-dlp exited with status {code}"),
            None => "yt-dlp was terminated by a signal".to_string(),
        });

    let contains_any = |markers: &[&str]| markers.iter().any(|m| stderr.contains(m));

    if contains_any(RATE_LIMIT_MARKERS) {
        tracing::warn!("YouTube rate limit detected");
        TranscriptError::tool(ToolFailure::RateLimited, message)
    } else if contains_any(UNAVAILABLE_MARKERS) {
        TranscriptError::VideoUnavailable(message)
    } else if contains_any(PROXY_MARKERS) {
        TranscriptError::tool(ToolFailure::Proxy, message)
    } else if contains_any(NETWORK_MARKERS) {
        TranscriptError::tool(ToolFailure::Network, message)
    } else {
        TranscriptError::tool(ToolFailure::Exit, message)
    }
}
