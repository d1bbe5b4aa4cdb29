use anyhow::Context;
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::cli::OutputFormat;
use crate::config::Config;
use crate::transcribe::{ExtractionOptions, RetryPolicy};
use crate::{utils, Result};

/// One `startUrls` entry: a bare string or an object with a `url` field
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum StartUrl {
    Plain(String),
    Request {
        #[serde(default)]
        url: Option<String>,
    },
}

impl StartUrl {
    fn url(&self) -> Option<&str> {
        match self {
            StartUrl::Plain(url) => Some(url),
            StartUrl::Request { url } => url.as_deref(),
        }
    }
}

/// JSON run input
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunInput {
    #[serde(default)]
    pub start_urls: Vec<StartUrl>,

    #[serde(default)]
    pub video_urls: Vec<String>,

    #[serde(default)]
    pub language: Option<String>,

    #[serde(default)]
    pub output_format: Option<OutputFormat>,

    /// Legacy switch; only consulted when `outputFormat` is absent
    #[serde(default)]
    pub include_timestamps: Option<bool>,

    #[serde(default)]
    pub prefer_manual_subtitles: Option<bool>,

    #[serde(default)]
    pub proxy: Option<String>,

    #[serde(default)]
    pub max_retries: Option<u32>,
}

impl RunInput {
    pub async fn load(path: &Path) -> Result<Self> {
        let content = fs_err::tokio::read_to_string(path)
            .await
            .context("Failed to read input file")?;

        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse input file {}", path.display()))
    }

    /// `startUrls` then `videoUrls`, trimmed, blanks dropped
    pub fn collect_urls(&self) -> Vec<String> {
        self.start_urls
            .iter()
            .filter_map(StartUrl::url)
            .chain(self.video_urls.iter().map(String::as_str))
            .map(str::trim)
            .filter(|url| !url.is_empty())
            .map(str::to_string)
            .collect()
    }

    fn output_format(&self) -> Option<OutputFormat> {
        self.output_format.or(match self.include_timestamps {
            Some(true) => Some(OutputFormat::Timestamped),
            _ => None,
        })
    }
}

/// Values given on the command line for `extract`
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub urls: Vec<String>,
    pub dataset: Option<PathBuf>,
    pub format: Option<OutputFormat>,
    pub language: Option<String>,
    pub prefer_auto: bool,
    pub proxy: Option<String>,
    pub max_retries: Option<u32>,
}

/// Fully resolved settings for one run
#[derive(Debug, Clone)]
pub struct RunSettings {
    pub urls: Vec<String>,
    pub options: ExtractionOptions,
    pub policy: RetryPolicy,
    /// `None` writes records to stdout
    pub dataset: Option<PathBuf>,
}

impl RunSettings {
    /// Command line beats the input file, which beats the config file
    pub fn resolve(cli: CliOverrides, input: Option<RunInput>, config: &Config) -> Result<Self> {
        let input = input.unwrap_or_default();

        let urls: Vec<String> = cli
            .urls
            .iter()
            .map(|url| url.trim())
            .filter(|url| !url.is_empty())
            .map(str::to_string)
            .chain(input.collect_urls())
            .collect();

        if urls.is_empty() {
            anyhow::bail!(
                "No video URLs provided. Please provide URLs in startUrls or videoUrls fields."
            );
        }

        let language = cli
            .language
            .or_else(|| input.language.clone())
            .or_else(|| config.app.default_language.clone())
            .filter(|lang| !lang.trim().is_empty());

        let format = cli
            .format
            .or_else(|| input.output_format())
            .unwrap_or(config.app.default_output_format);

        let prefer_manual = if cli.prefer_auto {
            false
        } else {
            input
                .prefer_manual_subtitles
                .unwrap_or(config.app.prefer_manual)
        };

        let proxy = cli
            .proxy
            .or_else(|| input.proxy.clone())
            .filter(|proxy| !proxy.trim().is_empty());

        let max_retries = cli
            .max_retries
            .or(input.max_retries)
            .unwrap_or(config.retry.max_retries);

        let dataset = cli
            .dataset
            .or_else(|| config.app.dataset_path.clone())
            .map(|path| {
                if path.is_dir() {
                    path.join(utils::default_dataset_filename())
                } else {
                    path
                }
            });

        Ok(Self {
            urls,
            options: ExtractionOptions {
                language,
                format,
                prefer_manual,
                proxy,
            },
            policy: RetryPolicy::from_config(&config.retry, max_retries),
            dataset,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(json: &str) -> RunInput {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn start_urls_accept_strings_and_objects() {
        let input = parse(
            r#"{
                "startUrls": ["https://youtu.be/dQw4w9WgXcQ", {"url": " https://www.youtube.com/shorts/dQw4w9WgXcQ "}, {}],
                "videoUrls": ["", "https://www.youtube.com/embed/dQw4w9WgXcQ"]
            }"#,
        );

        assert_eq!(
            input.collect_urls(),
            vec![
                "https://youtu.be/dQw4w9WgXcQ",
                "https://www.youtube.com/shorts/dQw4w9WgXcQ",
                "https://www.youtube.com/embed/dQw4w9WgXcQ",
            ]
        );
    }

    #[test]
    fn empty_input_is_fatal() {
        let err = RunSettings::resolve(
            CliOverrides::default(),
            Some(parse(r#"{"startUrls": [], "videoUrls": ["  "]}"#)),
            &Config::default(),
        )
        .unwrap_err();

        assert!(err.to_string().contains("No video URLs provided"));
    }

    #[test]
    fn input_file_overrides_config_and_cli_overrides_input() {
        let input = parse(
            r#"{
                "videoUrls": ["https://youtu.be/dQw4w9WgXcQ"],
                "language": "de",
                "outputFormat": "raw",
                "preferManualSubtitles": false,
                "proxy": "http://proxy.local:8080",
                "maxRetries": 5
            }"#,
        );

        let settings =
            RunSettings::resolve(CliOverrides::default(), Some(input.clone()), &Config::default())
                .unwrap();
        assert_eq!(settings.options.language.as_deref(), Some("de"));
        assert_eq!(settings.options.format, OutputFormat::Raw);
        assert!(!settings.options.prefer_manual);
        assert_eq!(settings.policy.max_attempts(), 5);
        assert!(settings.dataset.is_none());

        let cli = CliOverrides {
            language: Some("fr".to_string()),
            format: Some(OutputFormat::Plain),
            max_retries: Some(1),
            ..CliOverrides::default()
        };
        let settings = RunSettings::resolve(cli, Some(input), &Config::default()).unwrap();
        assert_eq!(settings.options.language.as_deref(), Some("fr"));
        assert_eq!(settings.options.format, OutputFormat::Plain);
        assert_eq!(settings.options.proxy.as_deref(), Some("http://proxy.local:8080"));
        assert_eq!(settings.policy.max_attempts(), 1);
    }

    #[test]
    fn include_timestamps_selects_timestamped_format() {
        let input = parse(r#"{"videoUrls": ["https://youtu.be/dQw4w9WgXcQ"], "includeTimestamps": true}"#);
        let settings = RunSettings::resolve(CliOverrides::default(), Some(input), &Config::default())
            .unwrap();

        assert_eq!(settings.options.format, OutputFormat::Timestamped);
        assert!(settings.options.prefer_manual);
        assert_eq!(settings.policy.max_attempts(), 3);
    }

    #[test]
    fn dataset_directory_gets_a_generated_file_name() {
        let dir = tempfile::tempdir().unwrap();
        let cli = CliOverrides {
            urls: vec!["https://youtu.be/dQw4w9WgXcQ".to_string()],
            dataset: Some(dir.path().to_path_buf()),
            ..CliOverrides::default()
        };

        let settings = RunSettings::resolve(cli, None, &Config::default()).unwrap();
        let dataset = settings.dataset.unwrap();
        assert_eq!(dataset.parent(), Some(dir.path()));
        assert!(dataset.extension().is_some_and(|ext| ext == "jsonl"));
    }

    #[test]
    fn loads_input_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("input.json");
        fs_err::write(&path, r#"{"startUrls": [{"url": "https://youtu.be/dQw4w9WgXcQ"}]}"#).unwrap();

        let input = tokio_test::block_on(RunInput::load(&path)).unwrap();
        assert_eq!(input.collect_urls(), vec!["https://youtu.be/dQw4w9WgXcQ"]);

        fs_err::write(&path, "not json").unwrap();
        assert!(tokio_test::block_on(RunInput::load(&path)).is_err());
    }
}
