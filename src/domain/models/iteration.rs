//! Per-round history and per-file optimization results.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

use super::metrics::QualityMetrics;
use super::parameters::{FieldCorrection, TrimParameters};

/// Read counts reported by the trimming tool for one round.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TrimReport {
    pub reads_before: Option<u64>,
    pub reads_after: Option<u64>,
    pub low_quality_reads: Option<u64>,
    pub too_many_n_reads: Option<u64>,
    pub too_short_reads: Option<u64>,
    pub adapter_trimmed_reads: Option<u64>,
}

impl TrimReport {
    pub fn reads_discarded(&self) -> Option<u64> {
        Some(self.reads_before?.saturating_sub(self.reads_after?))
    }

    /// Fraction of input reads that survived trimming.
    pub fn retention_rate(&self) -> Option<f64> {
        let before = self.reads_before?;
        let after = self.reads_after?;
        if before == 0 {
            return None;
        }
        Some(after as f64 / before as f64)
    }
}

/// Outcome of a single trimming round.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Verdict {
    /// Metrics passed the quality gate
    Accepted,
    /// Score strictly better than the best seen so far
    Improved,
    /// Score equal to or worse than the best seen so far
    NoImprovement,
    /// The round's report could not be parsed
    Failed,
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Accepted => "ACCEPTED",
            Self::Improved => "IMPROVED",
            Self::NoImprovement => "NO_IMPROVEMENT",
            Self::Failed => "FAILED",
        };
        f.write_str(s)
    }
}

/// One completed trimming round. Records are appended strictly in round
/// order and never modified afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IterationRecord {
    /// 1-based round index; round zero is the raw file
    pub round: u32,
    pub parameters: TrimParameters,
    #[serde(default)]
    pub corrections: Vec<FieldCorrection>,
    /// Trimmed file produced by this round
    pub output_file: PathBuf,
    pub trim_report: TrimReport,
    pub metrics: Option<QualityMetrics>,
    pub score: Option<f64>,
    pub verdict: Verdict,
    /// Why the quality gate rejected this round, or why it failed
    #[serde(default)]
    pub notes: Vec<String>,
    pub completed_at: DateTime<Utc>,
}

/// Analysis of the untouched input file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Baseline {
    pub metrics: QualityMetrics,
    pub score: f64,
    pub acceptable: bool,
}

/// Why the controller stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TerminationReason {
    QualityMet,
    MaxIterations,
    NoFurtherImprovement,
    HardFailure,
}

impl fmt::Display for TerminationReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::QualityMet => "QUALITY_MET",
            Self::MaxIterations => "MAX_ITERATIONS",
            Self::NoFurtherImprovement => "NO_FURTHER_IMPROVEMENT",
            Self::HardFailure => "HARD_FAILURE",
        };
        f.write_str(s)
    }
}

/// User-facing classification of a file's result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    /// Quality targets met
    Success,
    /// A usable best-effort file exists but targets were not met
    Partial,
    /// No trimming round completed
    Failed,
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Success => "success",
            Self::Partial => "partial",
            Self::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// Complete result of optimizing one input file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptimizationResult {
    pub input_file: PathBuf,
    pub baseline: Option<Baseline>,
    pub records: Vec<IterationRecord>,
    /// Round with the highest score; 0 is the raw file
    pub best_round: Option<u32>,
    pub best_score: Option<f64>,
    pub final_output: Option<PathBuf>,
    pub final_parameters: Option<TrimParameters>,
    pub termination: TerminationReason,
    pub outcome: Outcome,
    /// Human-readable cause of a hard failure
    pub error: Option<String>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl OptimizationResult {
    /// Number of trimming rounds that ran to completion, failed rounds
    /// included.
    pub fn rounds_executed(&self) -> usize {
        self.records.len()
    }

    pub fn best_record(&self) -> Option<&IterationRecord> {
        let best = self.best_round?;
        self.records.iter().find(|r| r.round == best)
    }

    pub fn final_metrics(&self) -> Option<&QualityMetrics> {
        match self.best_round? {
            0 => self.baseline.as_ref().map(|b| &b.metrics),
            _ => self.best_record().and_then(|r| r.metrics.as_ref()),
        }
    }
}
