//! Domain errors for the trimming optimizer.
//!
//! Each collaborator boundary has its own error type so the iteration
//! controller can decide per-kind whether a round, a file or nothing at all
//! has failed. Configuration errors live with the loader in
//! `infrastructure::config`.

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while turning a quality report into [`QualityMetrics`].
///
/// [`QualityMetrics`]: crate::domain::models::QualityMetrics
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ParseError {
    #[error("Quality report not found: {}", .0.display())]
    ReportNotFound(PathBuf),

    #[error("Failed to read quality report {}: {reason}", path.display())]
    Unreadable { path: PathBuf, reason: String },

    #[error("Quality report is missing required field: {0}")]
    MissingField(&'static str),

    #[error("Malformed number in section '{section}' at line {line}: {value:?}")]
    MalformedNumber {
        section: String,
        line: usize,
        value: String,
    },
}

/// Errors raised while obtaining a parameter proposal from the
/// recommendation service.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ProposalError {
    #[error("Recommendation service unreachable: {0}")]
    Unreachable(String),

    #[error("Recommendation service timed out after {0}s")]
    Timeout(u64),

    #[error("Recommendation service returned HTTP {status}: {message}")]
    Http { status: u16, message: String },

    #[error("Recommendation service returned an invalid body: {0}")]
    InvalidBody(String),

    #[error("No JSON object found in recommendation response")]
    NoJsonFound,

    #[error("Failed to load prompt template {}: {reason}", path.display())]
    Template { path: PathBuf, reason: String },
}

impl ProposalError {
    /// Whether another attempt could plausibly produce a different result.
    ///
    /// Client-side HTTP errors (unknown model, bad request) and template
    /// problems are permanent.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Unreachable(_) | Self::Timeout(_) | Self::NoJsonFound | Self::InvalidBody(_) => {
                true
            }
            Self::Http { status, .. } => *status >= 500 || *status == 429,
            Self::Template { .. } => false,
        }
    }
}

/// Errors raised by the external tools (quality analysis and trimming).
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ExecutionError {
    #[error("Failed to spawn {tool}: {reason}")]
    Spawn { tool: String, reason: String },

    #[error("{tool} exited with status {code:?}: {stderr}")]
    NonZeroExit {
        tool: String,
        code: Option<i32>,
        stderr: String,
    },

    #[error("{tool} timed out after {secs}s")]
    Timeout { tool: String, secs: u64 },

    #[error("{tool} produced no output at {}", path.display())]
    MissingOutput { tool: String, path: PathBuf },

    #[error("I/O error while running {tool}: {reason}")]
    Io { tool: String, reason: String },
}

impl ExecutionError {
    /// Only timeouts are retried: a deterministic tool fed identical
    /// arguments fails the same way twice.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }
}

/// Errors that end a single file's optimization.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum OptimizerError {
    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Proposal(#[from] ProposalError),

    #[error(transparent)]
    Execution(#[from] ExecutionError),

    #[error("Per-file time budget of {0}s exhausted")]
    Deadline(u64),

    #[error("Working directory error: {0}")]
    Workspace(String),
}

pub type OptimizerResult<T> = Result<T, OptimizerError>;
