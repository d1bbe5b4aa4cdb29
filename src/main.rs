use anyhow::Result;
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;
use tracing::Instrument;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use uuid::Uuid;

use yt_transcripts::extractors::YtDlpTool;
use yt_transcripts::input::{CliOverrides, RunInput, RunSettings};
use yt_transcripts::output::{JsonLinesDataset, ResultSink, StdoutSink};
use yt_transcripts::{utils, Cli, Commands, Config, TranscriptPipeline};

fn init_tracing(cli: &Cli) {
    let default_level = if cli.verbose {
        "yt_transcripts=debug"
    } else if cli.quiet {
        "yt_transcripts=warn"
    } else {
        "yt_transcripts=info"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| default_level.into());

    // Logs go to stderr; stdout may carry the dataset
    let registry = tracing_subscriber::registry().with(filter);
    if cli.json_logs {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(&cli);

    let config = match &cli.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load().await?,
    };

    match cli.command {
        Commands::Extract {
            urls,
            input,
            dataset,
            format,
            language,
            prefer_auto,
            proxy,
            max_retries,
            run_timeout,
        } => {
            let input = match input {
                Some(path) => Some(RunInput::load(&path).await?),
                None => None,
            };

            // Fails on an empty URL list before any dataset file is created
            let settings = RunSettings::resolve(
                CliOverrides {
                    urls,
                    dataset,
                    format,
                    language,
                    prefer_auto,
                    proxy,
                    max_retries,
                },
                input,
                &config,
            )?;

            let missing_deps = utils::check_dependencies(&config.tool.yt_dlp_path).await;
            if !missing_deps.is_empty() {
                tracing::warn!("Dependency check warnings:");
                for dep in missing_deps {
                    tracing::warn!("  • {}", dep);
                }
            }

            let run_id = Uuid::new_v4();
            let span = tracing::info_span!("run", run_id = %run_id);
            let run = run_extraction(settings, config, cli.quiet).instrument(span);

            let run_timeout = run_timeout.map(Duration::from_secs);
            let deadline = async {
                match run_timeout {
                    Some(limit) => tokio::time::sleep(limit).await,
                    None => std::future::pending().await,
                }
            };

            tokio::select! {
                result = run => result?,
                _ = tokio::signal::ctrl_c() => {
                    anyhow::bail!("Run {} cancelled", run_id);
                }
                _ = deadline => {
                    anyhow::bail!(
                        "Run {} exceeded the run timeout of {}",
                        run_id,
                        utils::format_duration(run_timeout.unwrap_or_default().as_secs_f64())
                    );
                }
            }
        }
        Commands::Config { show } => {
            if show {
                config.display();
            } else {
                let path = match &cli.config {
                    Some(path) => path.clone(),
                    None => Config::config_path()?,
                };
                config.save_to(&path)?;
                println!("Configuration written to: {}", path.display());
            }
        }
        Commands::Check => {
            let tool = YtDlpTool::from_config(&config.tool);
            if tool.check_availability().await {
                println!("✅ {} is available", config.tool.yt_dlp_path);
            } else {
                anyhow::bail!(
                    "{} was not found or failed to run; install it with `pip install yt-dlp`",
                    config.tool.yt_dlp_path
                );
            }
        }
    }

    Ok(())
}

async fn run_extraction(settings: RunSettings, config: Config, quiet: bool) -> Result<()> {
    let RunSettings {
        urls,
        options,
        policy,
        dataset,
    } = settings;

    tracing::info!(
        "Starting extraction of {} video(s) (format: {}, language: {}, proxy: {})",
        urls.len(),
        options.format,
        options.language.as_deref().unwrap_or("auto"),
        options
            .proxy
            .as_deref()
            .map(utils::redact_proxy)
            .unwrap_or_else(|| "direct".to_string())
    );

    let mut sink: Box<dyn ResultSink> = match &dataset {
        Some(path) => Box::new(JsonLinesDataset::open(path).await?),
        None => Box::new(StdoutSink),
    };

    let progress = if quiet || dataset.is_none() {
        ProgressBar::hidden()
    } else {
        let progress = ProgressBar::new(urls.len() as u64);
        progress.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")?,
        );
        progress
    };

    let tool = YtDlpTool::from_config(&config.tool);
    let pipeline = TranscriptPipeline::new(Box::new(tool)).with_temp_root(config.app.temp_dir.clone());

    let summary = pipeline
        .process_all(&urls, &options, &policy, sink.as_mut(), &progress)
        .await?;
    progress.finish_and_clear();

    tracing::info!(
        "Processing completed: {}/{} successful, {} failed",
        summary.succeeded,
        summary.total,
        summary.failed
    );
    if let Some(path) = &dataset {
        tracing::info!("Results saved to: {}", path.display());
    }

    Ok(())
}
