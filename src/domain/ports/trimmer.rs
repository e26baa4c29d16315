//! Trimming port - interface for the read-trimming tool.

use async_trait::async_trait;
use std::path::PathBuf;

use crate::domain::errors::ExecutionError;
use crate::domain::models::{TrimParameters, TrimReport};

/// A single trimming invocation.
#[derive(Debug, Clone)]
pub struct TrimRequest {
    pub input: PathBuf,
    pub output: PathBuf,
    pub parameters: TrimParameters,
    /// Directory receiving the tool's machine-readable report
    pub report_dir: PathBuf,
}

/// Result of a successful trimming invocation.
#[derive(Debug, Clone)]
pub struct TrimOutcome {
    pub output_file: PathBuf,
    pub report: TrimReport,
}

#[async_trait]
pub trait Trimmer: Send + Sync {
    /// Tool name used in logs and errors.
    fn name(&self) -> &'static str;

    /// Trim `request.input` into `request.output`.
    ///
    /// Not retried on failure: the same parameters against the same input
    /// produce the same result.
    async fn trim(&self, request: &TrimRequest) -> Result<TrimOutcome, ExecutionError>;

    /// Check whether the tool can be invoked at all.
    async fn is_available(&self) -> bool;
}
