use anyhow::Context;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;

use crate::transcribe::TranscriptResult;
use crate::Result;

pub mod formatters;

pub use formatters::*;

/// Append-only destination for result records
#[async_trait]
pub trait ResultSink: Send {
    /// Write one record; records are never rewritten afterwards
    async fn push(&mut self, result: &TranscriptResult) -> Result<()>;

    /// Flush buffered records
    async fn finish(&mut self) -> Result<()> {
        Ok(())
    }
}

/// JSON Lines file opened in append mode
pub struct JsonLinesDataset {
    path: PathBuf,
    file: fs_err::tokio::File,
    written: usize,
}

impl JsonLinesDataset {
    /// Open (or create) the dataset file for appending
    pub async fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs_err::tokio::create_dir_all(parent).await?;
        }

        let file = fs_err::tokio::OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .await
            .context("Failed to open dataset file")?;

        Ok(Self {
            path: path.to_path_buf(),
            file,
            written: 0,
        })
    }
}

#[async_trait]
impl ResultSink for JsonLinesDataset {
    async fn push(&mut self, result: &TranscriptResult) -> Result<()> {
        let mut line = serde_json::to_string(result).context("Failed to serialize result")?;
        line.push('\n');

        self.file
            .write_all(line.as_bytes())
            .await
            .context("Failed to write dataset record")?;
        self.file.flush().await?;
        self.written += 1;
        Ok(())
    }

    async fn finish(&mut self) -> Result<()> {
        self.file.flush().await?;
        tracing::info!("Wrote {} records to {}", self.written, self.path.display());
        Ok(())
    }
}

/// Prints one JSON record per line on stdout
#[derive(Default)]
pub struct StdoutSink;

#[async_trait]
impl ResultSink for StdoutSink {
    async fn push(&mut self, result: &TranscriptResult) -> Result<()> {
        let line = serde_json::to_string(result).context("Failed to serialize result")?;
        println!("{}", line);
        Ok(())
    }
}

/// Collects records in memory
#[cfg(test)]
#[derive(Default)]
pub struct MemorySink {
    pub records: Vec<TranscriptResult>,
}

#[cfg(test)]
#[async_trait]
impl ResultSink for MemorySink {
    async fn push(&mut self, result: &TranscriptResult) -> Result<()> {
        self.records.push(result.clone());
        Ok(())
    }
}
