use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::cli::OutputFormat;
use crate::Result;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Caption tool invocation
    pub tool: ToolConfig,

    /// Retry and backoff policy
    pub retry: RetryConfig,

    /// Application settings
    pub app: AppConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolConfig {
    /// Path or name of the yt-dlp executable
    pub yt_dlp_path: String,

    /// Per-invocation timeout in seconds
    pub timeout_secs: u64,

    /// Extra arguments appended to every invocation
    pub extra_args: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Attempts per video when the input does not say otherwise
    pub max_retries: u32,

    /// Delay before the second attempt, in milliseconds
    pub backoff_base_ms: u64,

    /// Upper bound for any single delay, in milliseconds
    pub backoff_cap_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Temporary directory for subtitle downloads
    pub temp_dir: Option<PathBuf>,

    /// Default subtitle language (auto-detect if not set)
    pub default_language: Option<String>,

    /// Prefer manual subtitles over auto-generated captions
    pub prefer_manual: bool,

    /// Default transcript format
    pub default_output_format: OutputFormat,

    /// Default dataset file (stdout if not set)
    pub dataset_path: Option<PathBuf>,
}

impl Default for ToolConfig {
    fn default() -> Self {
        Self {
            yt_dlp_path: "yt-dlp".to_string(),
            timeout_secs: 120,
            extra_args: Vec::new(),
        }
    }
}

impl ToolConfig {
    /// Limit for a single yt-dlp invocation
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            backoff_base_ms: 5_000,
            backoff_cap_ms: 60_000,
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            temp_dir: None,
            default_language: None,
            prefer_manual: true,
            default_output_format: OutputFormat::Plain,
            dataset_path: None,
        }
    }
}

impl Config {
    /// Load configuration from file or create default
    pub async fn load() -> Result<Self> {
        let config_path = Self::config_path()?;

        if config_path.exists() {
            Self::load_from(&config_path)
        } else {
            let config = Self::default();
            config.save_to(&config_path)?;
            Ok(config)
        }
    }

    /// Load configuration from an explicit path, falling back to defaults if it is missing
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::debug!("Config file {} not found, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = fs_err::read_to_string(path).context("Failed to read config file")?;

        let config: Config =
            serde_yaml::from_str(&content).context("Failed to parse config file")?;

        config.validate()?;
        Ok(config)
    }

    /// Save configuration to file
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs_err::create_dir_all(parent)?;
        }

        let content = serde_yaml::to_string(self).context("Failed to serialize config")?;

        fs_err::write(path, content).context("Failed to write config file")?;

        Ok(())
    }

    /// Get configuration file path
    pub fn config_path() -> Result<PathBuf> {
        // First try current directory for easy testing
        let local_config = PathBuf::from("config.yaml");
        if local_config.exists() {
            return Ok(local_config);
        }

        let config_dir = dirs::config_dir().context("Could not determine config directory")?;

        Ok(config_dir.join("yt-transcripts").join("config.yaml"))
    }

    /// Validate configuration
    fn validate(&self) -> Result<()> {
        if self.tool.yt_dlp_path.trim().is_empty() {
            anyhow::bail!("tool.yt_dlp_path must not be empty");
        }

        if self.tool.timeout_secs == 0 {
            anyhow::bail!("tool.timeout_secs must be greater than zero");
        }

        if self.retry.backoff_cap_ms < self.retry.backoff_base_ms {
            anyhow::bail!("retry.backoff_cap_ms must not be smaller than retry.backoff_base_ms");
        }

        Ok(())
    }

    /// Display current configuration
    pub fn display(&self) {
        println!("Current Configuration:");
        println!("  yt-dlp: {}", self.tool.yt_dlp_path);
        println!("  Tool Timeout: {}s", self.tool.timeout_secs);
        if !self.tool.extra_args.is_empty() {
            println!("  Extra Args: {}", self.tool.extra_args.join(" "));
        }
        println!("  Max Retries: {}", self.retry.max_retries);
        println!(
            "  Backoff: {}ms doubling, capped at {}ms",
            self.retry.backoff_base_ms, self.retry.backoff_cap_ms
        );
        println!(
            "  Language: {}",
            self.app.default_language.as_deref().unwrap_or("auto")
        );
        println!("  Prefer Manual Subtitles: {}", self.app.prefer_manual);
        println!("  Default Format: {}", self.app.default_output_format);
        if let Some(dataset) = &self.app.dataset_path {
            println!("  Dataset: {}", dataset.display());
        }
    }
}
