//! Quality-analysis port - interface for the tool producing quality reports.

use async_trait::async_trait;
use std::path::{Path, PathBuf};

use crate::domain::errors::ExecutionError;

/// Runs a quality analysis over a read file.
#[async_trait]
pub trait QualityAnalyzer: Send + Sync {
    /// Tool name used in logs and errors.
    fn name(&self) -> &'static str;

    /// Analyze `input`, writing artifacts under `output_dir`.
    ///
    /// Returns the path of the report artifact. A non-zero exit or a missing
    /// artifact is an [`ExecutionError`].
    async fn analyze(&self, input: &Path, output_dir: &Path) -> Result<PathBuf, ExecutionError>;

    /// Check whether the tool can be invoked at all.
    async fn is_available(&self) -> bool;
}
