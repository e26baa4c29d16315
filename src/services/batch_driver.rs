//! Runs the iteration controller across many input files.

use anyhow::{Context, Result};
use chrono::Utc;
use futures::future::join_all;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};
use uuid::Uuid;

use super::iteration_controller::IterationController;
use crate::domain::models::{
    is_gzipped, sample_stem, BatchSummary, Config, OptimizationResult, Outcome, TerminationReason,
};
use crate::infrastructure::persistence::SummaryWriter;

/// Called once per file as soon as its result is available.
pub type ProgressCallback = Arc<dyn Fn(&OptimizationResult) + Send + Sync>;

enum Slot {
    Done(OptimizationResult),
    Running {
        input: PathBuf,
        workdir: PathBuf,
        handle: JoinHandle<OptimizationResult>,
    },
}

/// Bounded fan-out of one controller run per file.
pub struct BatchDriver {
    controller: Arc<IterationController>,
    writer: SummaryWriter,
    workers: usize,
    model: String,
    max_iterations: u32,
    progress: Option<ProgressCallback>,
}

impl BatchDriver {
    pub fn new(controller: Arc<IterationController>, config: &Config) -> Self {
        Self {
            controller,
            writer: SummaryWriter::new(&config.batch.output_dir),
            workers: config.batch.workers.max(1),
            model: config.recommender.model.clone(),
            max_iterations: config.optimizer.max_iterations,
            progress: None,
        }
    }

    #[must_use]
    pub fn with_progress(mut self, progress: ProgressCallback) -> Self {
        self.progress = Some(progress);
        self
    }

    /// Optimize every input and persist the summaries.
    ///
    /// A failure in one file never affects another; the returned summary
    /// holds one result per input, in input order.
    pub async fn run(&self, inputs: &[PathBuf]) -> Result<BatchSummary> {
        let run_id = Uuid::new_v4();
        let started_at = Utc::now();
        let output_dir = self.writer.output_dir().to_path_buf();
        tokio::fs::create_dir_all(&output_dir)
            .await
            .with_context(|| format!("Failed to create output directory: {}", output_dir.display()))?;

        info!(%run_id, files = inputs.len(), workers = self.workers, "starting batch");

        let semaphore = Arc::new(Semaphore::new(self.workers));
        let workdirs = assign_workdirs(&output_dir, inputs);
        let mut slots = Vec::with_capacity(inputs.len());

        for (input, workdir) in inputs.iter().zip(workdirs) {
            if let Err(reason) = validate_input(input).await {
                warn!(file = %input.display(), %reason, "rejecting input");
                let result = failed_result(input, reason);
                self.finished(&workdir, &result).await;
                slots.push(Slot::Done(result));
                continue;
            }

            let semaphore = semaphore.clone();
            let controller = self.controller.clone();
            let writer = self.writer.clone();
            let progress = self.progress.clone();
            let file = input.clone();
            let dir = workdir.clone();

            let handle = tokio::spawn(async move {
                // The semaphore is never closed
                let _permit = semaphore.acquire_owned().await.ok();
                let result = controller.optimize(&file, &dir).await;
                persist(&writer, &dir, &result).await;
                if let Some(progress) = &progress {
                    progress(&result);
                }
                result
            });
            slots.push(Slot::Running {
                input: input.clone(),
                workdir,
                handle,
            });
        }

        let results = join_all(slots.into_iter().map(|slot| self.settle(slot))).await;
        let summary = BatchSummary::from_results(
            run_id,
            self.model.clone(),
            self.max_iterations,
            started_at,
            results,
        );
        self.writer.write_batch_summary(&summary).await?;

        info!(
            %run_id,
            succeeded = summary.succeeded,
            partial = summary.partial,
            failed = summary.failed,
            "batch finished"
        );
        Ok(summary)
    }

    async fn settle(&self, slot: Slot) -> OptimizationResult {
        match slot {
            Slot::Done(result) => result,
            Slot::Running {
                input,
                workdir,
                handle,
            } => match handle.await {
                Ok(result) => result,
                Err(e) => {
                    error!(file = %input.display(), error = %e, "optimization task aborted");
                    let result = failed_result(&input, format!("optimization task aborted: {e}"));
                    self.finished(&workdir, &result).await;
                    result
                }
            },
        }
    }

    async fn finished(&self, workdir: &Path, result: &OptimizationResult) {
        persist(&self.writer, workdir, result).await;
        if let Some(progress) = &self.progress {
            progress(result);
        }
    }
}

async fn persist(writer: &SummaryWriter, workdir: &Path, result: &OptimizationResult) {
    if let Err(e) = writer.write_file_summary(workdir, result).await {
        error!(file = %result.input_file.display(), error = %e, "failed to write file summary");
    }
}

/// HARD_FAILURE result for a file that never completed a round.
fn failed_result(input: &Path, reason: String) -> OptimizationResult {
    let now = Utc::now();
    OptimizationResult {
        input_file: input.to_path_buf(),
        baseline: None,
        records: Vec::new(),
        best_round: None,
        best_score: None,
        final_output: None,
        final_parameters: None,
        termination: TerminationReason::HardFailure,
        outcome: Outcome::Failed,
        error: Some(reason),
        started_at: now,
        finished_at: now,
    }
}

/// One working directory per input, named after the sample and suffixed
/// `_2`, `_3`... when two inputs share a name.
pub fn assign_workdirs(output_dir: &Path, inputs: &[PathBuf]) -> Vec<PathBuf> {
    let mut taken = HashSet::new();
    inputs
        .iter()
        .map(|input| {
            let stem = sample_stem(input);
            let mut name = stem.clone();
            let mut n = 1;
            while !taken.insert(name.clone()) {
                n += 1;
                name = format!("{stem}_{n}");
            }
            output_dir.join(name)
        })
        .collect()
}

/// Cheap sanity check that `path` is a FASTQ file.
///
/// Plain files must open with a complete four-line record; compressed files
/// are only checked for existence.
pub async fn validate_input(path: &Path) -> Result<(), String> {
    let meta = tokio::fs::metadata(path)
        .await
        .map_err(|e| format!("cannot read {}: {e}", path.display()))?;
    if !meta.is_file() {
        return Err(format!("{} is not a file", path.display()));
    }
    if is_gzipped(path) {
        return Ok(());
    }

    let file = tokio::fs::File::open(path)
        .await
        .map_err(|e| format!("cannot open {}: {e}", path.display()))?;
    let mut lines = BufReader::new(file).lines();
    let mut record = Vec::with_capacity(4);
    while record.len() < 4 {
        match lines.next_line().await {
            Ok(Some(line)) => record.push(line),
            Ok(None) => break,
            Err(e) => return Err(format!("cannot read {}: {e}", path.display())),
        }
    }

    match record.as_slice() {
        [header, sequence, separator, quality]
            if header.starts_with('@')
                && separator.starts_with('+')
                && sequence.trim_end().len() == quality.trim_end().len() =>
        {
            Ok(())
        }
        [] => Err(format!("{} is empty", path.display())),
        _ => Err(format!(
            "{} does not look like FASTQ (expected '@' header, sequence, '+' and quality lines)",
            path.display()
        )),
    }
}
