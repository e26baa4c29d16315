//! Round-by-round optimization of a single read file.
//!
//! ```text
//! INIT -> ANALYZE_RAW -> EVALUATE -> {DONE | PROPOSE}
//! PROPOSE -> TRIM -> ANALYZE_TRIMMED -> EVALUATE -> {DONE | PROPOSE | FAIL}
//! ```
//!
//! The raw file is round zero. Each later round trims the best file seen so
//! far, so the chosen output is always the highest-scoring file rather than
//! the last one produced.

use chrono::{DateTime, Utc};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

use super::metrics_extractor::MetricsExtractor;
use super::parameter_proposer::ParameterProposer;
use super::quality_gate::QualityGate;
use crate::domain::errors::{OptimizerError, OptimizerResult, ParseError};
use crate::domain::models::{
    sample_stem, Baseline, Config, IterationRecord, OptimizationResult, OptimizerConfig, Outcome,
    Proposal, QualityMetrics, TerminationReason, TrimParameters, Verdict,
};
use crate::domain::ports::{QualityAnalyzer, TrimOutcome, TrimRequest, Trimmer};

/// Controller phases. `Done` is terminal; failures leave the loop as errors.
#[derive(Debug)]
enum Phase {
    AnalyzeRaw,
    Propose,
    Trim(Proposal),
    AnalyzeTrimmed(Box<TrimmedRound>),
    Evaluate(Box<TrimmedRound>, Result<QualityMetrics, ParseError>),
    Done(TerminationReason),
}

#[derive(Debug)]
struct TrimmedRound {
    round: u32,
    proposal: Proposal,
    outcome: TrimOutcome,
}

/// The file every next round starts from.
#[derive(Debug, Clone)]
struct Best {
    round: u32,
    score: f64,
    file: PathBuf,
    metrics: QualityMetrics,
    parameters: Option<TrimParameters>,
}

/// Mutable state of one file's optimization, owned by a single
/// [`IterationController::optimize`] call.
#[derive(Debug)]
struct FileRun {
    input: PathBuf,
    workdir: PathBuf,
    stem: String,
    started_at: DateTime<Utc>,
    baseline: Option<Baseline>,
    records: Vec<IterationRecord>,
    best: Option<Best>,
    non_improving: u32,
    /// Output of a trim that has not been evaluated yet
    pending: Option<PathBuf>,
}

impl FileRun {
    fn new(input: &Path, workdir: &Path) -> Self {
        Self {
            input: input.to_path_buf(),
            workdir: workdir.to_path_buf(),
            stem: sample_stem(input),
            started_at: Utc::now(),
            baseline: None,
            records: Vec::new(),
            best: None,
            non_improving: 0,
            pending: None,
        }
    }

    fn next_round(&self) -> u32 {
        self.records.len() as u32 + 1
    }

    fn round_dir(&self, round: u32) -> PathBuf {
        self.workdir.join(format!("round{round}"))
    }
}

/// Drives one file through analysis, proposal and trimming rounds.
///
/// Holds no per-file state, so one instance can serve many files
/// concurrently; each [`optimize`](Self::optimize) call owns its own history.
pub struct IterationController {
    settings: OptimizerConfig,
    gate: QualityGate,
    analyzer: Arc<dyn QualityAnalyzer>,
    trimmer: Arc<dyn Trimmer>,
    proposer: Arc<ParameterProposer>,
}

impl IterationController {
    pub fn new(
        config: &Config,
        analyzer: Arc<dyn QualityAnalyzer>,
        trimmer: Arc<dyn Trimmer>,
        proposer: Arc<ParameterProposer>,
    ) -> Self {
        Self {
            settings: config.optimizer.clone(),
            gate: QualityGate::new(config.quality_gate.clone()),
            analyzer,
            trimmer,
            proposer,
        }
    }

    /// Optimize `input`, writing every artifact under `workdir`.
    ///
    /// Never fails: errors become a HARD_FAILURE result carrying the best
    /// round reached before the failure.
    #[instrument(skip_all, fields(file = %input.display()))]
    pub async fn optimize(&self, input: &Path, workdir: &Path) -> OptimizationResult {
        let mut run = FileRun::new(input, workdir);
        let budget = self.settings.per_file_timeout_secs;

        let (termination, error) =
            match tokio::time::timeout(Duration::from_secs(budget), self.drive(&mut run)).await {
                Ok(Ok(reason)) => (reason, None),
                Ok(Err(e)) => (TerminationReason::HardFailure, Some(e)),
                Err(_) => (
                    TerminationReason::HardFailure,
                    Some(OptimizerError::Deadline(budget)),
                ),
            };

        if let Some(e) = &error {
            warn!(error = %e, rounds = run.records.len(), "optimization failed");
        }
        self.finish(run, termination, error).await
    }

    async fn drive(&self, run: &mut FileRun) -> OptimizerResult<TerminationReason> {
        tokio::fs::create_dir_all(&run.workdir)
            .await
            .map_err(|e| OptimizerError::Workspace(format!("{}: {e}", run.workdir.display())))?;

        let mut phase = Phase::AnalyzeRaw;
        loop {
            phase = match phase {
                Phase::AnalyzeRaw => self.analyze_raw(run).await?,
                Phase::Propose => {
                    let metrics = run
                        .best
                        .as_ref()
                        .map(|b| b.metrics.clone())
                        .ok_or_else(|| OptimizerError::Workspace("no baseline metrics".to_string()))?;
                    let proposal = self.proposer.propose(&metrics, &run.records).await?;
                    Phase::Trim(proposal)
                }
                Phase::Trim(proposal) => self.trim(run, proposal).await?,
                Phase::AnalyzeTrimmed(trimmed) => {
                    let dir = run.round_dir(trimmed.round).join("qc");
                    let report = self.analyzer.analyze(&trimmed.outcome.output_file, &dir).await?;
                    let metrics = MetricsExtractor::extract(&report).await;
                    Phase::Evaluate(trimmed, metrics)
                }
                Phase::Evaluate(trimmed, metrics) => self.evaluate(run, *trimmed, metrics).await,
                Phase::Done(reason) => return Ok(reason),
            };
            debug!(?phase, "transition");
        }
    }

    async fn analyze_raw(&self, run: &mut FileRun) -> OptimizerResult<Phase> {
        let dir = run.workdir.join("raw_qc");
        let report = self.analyzer.analyze(&run.input, &dir).await?;
        let metrics = MetricsExtractor::extract(&report).await?;
        let verdict = self.gate.evaluate(&metrics);

        info!(
            score = verdict.score,
            acceptable = verdict.acceptable,
            reasons = ?verdict.reasons,
            "raw file analyzed"
        );

        run.best = Some(Best {
            round: 0,
            score: verdict.score,
            file: run.input.clone(),
            metrics: metrics.clone(),
            parameters: None,
        });
        run.baseline = Some(Baseline {
            metrics,
            score: verdict.score,
            acceptable: verdict.acceptable,
        });

        if verdict.acceptable {
            Ok(Phase::Done(TerminationReason::QualityMet))
        } else {
            Ok(Phase::Propose)
        }
    }

    async fn trim(&self, run: &mut FileRun, proposal: Proposal) -> OptimizerResult<Phase> {
        let round = run.next_round();
        let source = run
            .best
            .as_ref()
            .map_or_else(|| run.input.clone(), |b| b.file.clone());
        let dir = run.round_dir(round);
        let request = TrimRequest {
            input: source,
            output: dir.join(format!("{}_round{round}.fastq", run.stem)),
            parameters: proposal.parameters,
            report_dir: dir,
        };

        info!(round, parameters = %request.parameters, "trimming");
        run.pending = Some(request.output.clone());
        let outcome = self.trimmer.trim(&request).await?;
        Ok(Phase::AnalyzeTrimmed(Box::new(TrimmedRound {
            round,
            proposal,
            outcome,
        })))
    }

    /// Record the round, update the best file and choose the next phase.
    async fn evaluate(
        &self,
        run: &mut FileRun,
        trimmed: TrimmedRound,
        metrics: Result<QualityMetrics, ParseError>,
    ) -> Phase {
        let TrimmedRound {
            round,
            proposal,
            outcome,
        } = trimmed;
        run.pending = None;
        let best_score = run.best.as_ref().map_or(f64::NEG_INFINITY, |b| b.score);

        let (verdict, score, notes, metrics) = match metrics {
            Err(e) => {
                warn!(round, error = %e, "trimmed report unusable, round failed");
                (Verdict::Failed, None, vec![e.to_string()], None)
            }
            Ok(metrics) => {
                let gate = self.gate.evaluate(&metrics);
                let verdict = if gate.acceptable {
                    Verdict::Accepted
                } else if gate.score > best_score {
                    Verdict::Improved
                } else {
                    Verdict::NoImprovement
                };
                (verdict, Some(gate.score), gate.reasons, Some(metrics))
            }
        };

        info!(round, %verdict, score, best_score, "round evaluated");

        let record = IterationRecord {
            round,
            parameters: proposal.parameters,
            corrections: proposal.corrections,
            output_file: outcome.output_file.clone(),
            trim_report: outcome.report,
            metrics: metrics.clone(),
            score,
            verdict,
            notes,
            completed_at: Utc::now(),
        };
        run.records.push(record);

        match (verdict, score, metrics) {
            (Verdict::Accepted | Verdict::Improved, Some(score), Some(metrics)) => {
                let superseded = run.best.replace(Best {
                    round,
                    score,
                    file: outcome.output_file,
                    metrics,
                    parameters: Some(proposal.parameters),
                });
                if let Some(old) = superseded.filter(|b| b.round > 0) {
                    self.discard(&old.file).await;
                }
                run.non_improving = 0;
            }
            _ => {
                self.discard(&outcome.output_file).await;
                run.non_improving += 1;
            }
        }

        if verdict == Verdict::Accepted {
            return Phase::Done(TerminationReason::QualityMet);
        }
        if run.non_improving > self.settings.no_improvement_tolerance {
            return Phase::Done(TerminationReason::NoFurtherImprovement);
        }
        if round >= self.settings.max_iterations {
            return Phase::Done(TerminationReason::MaxIterations);
        }
        Phase::Propose
    }

    /// Remove a superseded round output unless intermediates are kept.
    async fn discard(&self, file: &Path) {
        if self.settings.keep_intermediate {
            return;
        }
        match tokio::fs::remove_file(file).await {
            Ok(()) => debug!(file = %file.display(), "removed superseded output"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!(file = %file.display(), error = %e, "failed to remove superseded output"),
        }
    }

    async fn finish(
        &self,
        run: FileRun,
        termination: TerminationReason,
        error: Option<OptimizerError>,
    ) -> OptimizationResult {
        let FileRun {
            input,
            workdir,
            stem,
            started_at,
            baseline,
            records,
            best,
            pending,
            ..
        } = run;

        let best_file = best.as_ref().map(|b| b.file.clone());
        let outputs = records.iter().map(|r| &r.output_file).chain(pending.as_ref());
        for file in outputs {
            if Some(file) != best_file.as_ref() {
                self.discard(file).await;
            }
        }

        let final_output = match &best {
            Some(b) if b.round > 0 => {
                let target = workdir.join(format!("{stem}_trimmed.fastq"));
                match self.publish(&b.file, &target).await {
                    Ok(()) => Some(target),
                    Err(e) => {
                        warn!(error = %e, "could not publish final output, keeping round file");
                        Some(b.file.clone())
                    }
                }
            }
            Some(_) => Some(input.clone()),
            None => None,
        };

        let outcome = match termination {
            TerminationReason::QualityMet => Outcome::Success,
            TerminationReason::HardFailure if records.is_empty() => Outcome::Failed,
            _ => Outcome::Partial,
        };

        let result = OptimizationResult {
            input_file: input,
            baseline,
            records,
            best_round: best.as_ref().map(|b| b.round),
            best_score: best.as_ref().map(|b| b.score),
            final_output,
            final_parameters: best.as_ref().and_then(|b| b.parameters),
            termination,
            outcome,
            error: error.map(|e| e.to_string()),
            started_at,
            finished_at: Utc::now(),
        };

        info!(
            %termination,
            %outcome,
            rounds = result.rounds_executed(),
            best_round = result.best_round,
            best_score = result.best_score,
            "optimization finished"
        );
        result
    }

    /// Move (or copy, when intermediates are kept) the best round's file.
    async fn publish(&self, from: &Path, to: &Path) -> std::io::Result<()> {
        if self.settings.keep_intermediate {
            tokio::fs::copy(from, to).await.map(|_| ())
        } else if tokio::fs::rename(from, to).await.is_ok() {
            Ok(())
        } else {
            tokio::fs::copy(from, to).await?;
            tokio::fs::remove_file(from).await
        }
    }
}
