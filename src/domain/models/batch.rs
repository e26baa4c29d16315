//! Batch-level aggregation of per-file results.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

use super::iteration::{OptimizationResult, Outcome, TerminationReason};

/// Summary of one batch run, persisted next to the per-file summaries.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchSummary {
    pub run_id: Uuid,
    pub model: String,
    pub max_iterations: u32,
    pub total_files: usize,
    pub succeeded: usize,
    pub partial: usize,
    pub failed: usize,
    pub by_reason: BTreeMap<TerminationReason, usize>,
    /// Mean of every file's best score, when any file produced one
    pub mean_best_score: Option<f64>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub results: Vec<OptimizationResult>,
}

impl BatchSummary {
    pub fn from_results(
        run_id: Uuid,
        model: impl Into<String>,
        max_iterations: u32,
        started_at: DateTime<Utc>,
        results: Vec<OptimizationResult>,
    ) -> Self {
        let mut by_reason = BTreeMap::new();
        let (mut succeeded, mut partial, mut failed) = (0, 0, 0);

        for result in &results {
            *by_reason.entry(result.termination).or_insert(0) += 1;
            match result.outcome {
                Outcome::Success => succeeded += 1,
                Outcome::Partial => partial += 1,
                Outcome::Failed => failed += 1,
            }
        }

        let scores: Vec<f64> = results.iter().filter_map(|r| r.best_score).collect();
        let mean_best_score = if scores.is_empty() {
            None
        } else {
            Some(scores.iter().sum::<f64>() / scores.len() as f64)
        };

        Self {
            run_id,
            model: model.into(),
            max_iterations,
            total_files: results.len(),
            succeeded,
            partial,
            failed,
            by_reason,
            mean_best_score,
            started_at,
            finished_at: Utc::now(),
            results,
        }
    }

    pub fn all_succeeded(&self) -> bool {
        self.succeeded == self.total_files
    }
}
