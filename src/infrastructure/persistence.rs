//! JSON summaries written next to the trimmed outputs.

use anyhow::{Context, Result};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::domain::models::{BatchSummary, OptimizationResult};

pub const FILE_SUMMARY: &str = "summary.json";
pub const BATCH_SUMMARY: &str = "batch_summary.json";

/// Writes per-file and batch summaries under an output directory.
#[derive(Debug, Clone)]
pub struct SummaryWriter {
    output_dir: PathBuf,
}

impl SummaryWriter {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
        }
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Write `<workdir>/summary.json`.
    pub async fn write_file_summary(&self, workdir: &Path, result: &OptimizationResult) -> Result<PathBuf> {
        write_json(&workdir.join(FILE_SUMMARY), result).await
    }

    /// Write `<output_dir>/batch_summary.json`.
    pub async fn write_batch_summary(&self, summary: &BatchSummary) -> Result<PathBuf> {
        write_json(&self.output_dir.join(BATCH_SUMMARY), summary).await
    }
}

async fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<PathBuf> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
    }
    let json = serde_json::to_vec_pretty(value).context("Failed to serialize summary")?;
    tokio::fs::write(path, json)
        .await
        .with_context(|| format!("Failed to write summary: {}", path.display()))?;
    debug!(path = %path.display(), "summary written");
    Ok(path.to_path_buf())
}
