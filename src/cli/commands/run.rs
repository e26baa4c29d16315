//! Implementation of the `trimwise run` command.

use anyhow::{Context, Result};
use clap::Args;
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;

use crate::adapters::ollama::OllamaClient;
use crate::adapters::tools::{FastQcAnalyzer, FastpTrimmer};
use crate::cli::output::{create_progress_bar, output, CommandOutput, TableFormatter};
use crate::domain::models::{BatchSummary, Config, OptimizationResult, Outcome};
use crate::infrastructure::persistence::BATCH_SUMMARY;
use crate::infrastructure::retry::RetryPolicy;
use crate::services::{BatchDriver, IterationController, ParameterProposer, PromptBuilder};

#[derive(Args, Debug, Default)]
pub struct RunArgs {
    /// FASTQ files to optimize (plain or gzip-compressed)
    #[arg(required = true)]
    pub files: Vec<PathBuf>,

    /// Output directory for trimmed files and summaries
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Threads per FastQC / fastp invocation
    #[arg(short, long)]
    pub threads: Option<u32>,

    /// Files optimized concurrently
    #[arg(short, long)]
    pub workers: Option<usize>,

    /// Maximum trimming rounds per file
    #[arg(long)]
    pub max_iterations: Option<u32>,

    /// Model used for parameter recommendations
    #[arg(long)]
    pub model: Option<String>,

    /// Custom prompt template file
    #[arg(long)]
    pub prompt: Option<PathBuf>,

    /// Keep the output of every round
    #[arg(long)]
    pub keep_intermediate: bool,
}

impl RunArgs {
    /// Apply flag overrides on top of the loaded configuration.
    pub fn apply(&self, config: &mut Config) {
        if let Some(dir) = &self.output {
            config.batch.output_dir.clone_from(dir);
        }
        if let Some(threads) = self.threads {
            config.tools.threads = threads;
        }
        if let Some(workers) = self.workers {
            config.batch.workers = workers;
        }
        if let Some(n) = self.max_iterations {
            config.optimizer.max_iterations = n;
        }
        if let Some(model) = &self.model {
            config.recommender.model.clone_from(model);
        }
        if let Some(prompt) = &self.prompt {
            config.recommender.prompt_template = Some(prompt.clone());
        }
        if self.keep_intermediate {
            config.optimizer.keep_intermediate = true;
        }
    }
}

#[derive(Debug, Serialize)]
pub struct RunOutput {
    pub summary_path: PathBuf,
    #[serde(flatten)]
    pub summary: BatchSummary,
}

impl CommandOutput for RunOutput {
    fn to_human(&self) -> String {
        let formatter = TableFormatter::new();
        let s = &self.summary;
        let mut lines = vec![formatter.format_results(&s.results)];

        for result in s.results.iter().filter(|r| !r.records.is_empty()) {
            lines.push(format!("\n{}", result.input_file.display()));
            lines.push(formatter.format_rounds(result));
        }
        for result in s.results.iter().filter(|r| r.outcome == Outcome::Failed) {
            if let Some(error) = &result.error {
                lines.push(format!("{}: {error}", result.input_file.display()));
            }
        }

        lines.push(format!(
            "\n{} succeeded, {} partial, {} failed of {} file(s)",
            s.succeeded, s.partial, s.failed, s.total_files
        ));
        if let Some(mean) = s.mean_best_score {
            lines.push(format!("Mean best score: {mean:.3}"));
        }
        lines.push(format!("Summary written to {}", self.summary_path.display()));
        lines.join("\n")
    }

    fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_default()
    }
}

/// Wire the real adapters into a controller.
pub fn build_controller(config: &Config) -> Result<Arc<IterationController>> {
    let tool_retry = RetryPolicy::from(&config.retry);
    let analyzer = Arc::new(FastQcAnalyzer::new(&config.tools, tool_retry.clone()));
    let trimmer = Arc::new(FastpTrimmer::new(&config.tools, tool_retry));

    let client = OllamaClient::new(&config.recommender).context("Failed to create recommendation client")?;
    let prompts = PromptBuilder::from_config(&config.recommender);
    let proposer = Arc::new(ParameterProposer::new(
        Arc::new(client),
        prompts,
        RetryPolicy::from(&config.retry),
    ));

    Ok(Arc::new(IterationController::new(config, analyzer, trimmer, proposer)))
}

/// Returns whether every file met its quality targets.
pub async fn execute(args: RunArgs, config: Config, json_mode: bool) -> Result<bool> {
    let controller = build_controller(&config)?;

    let progress = create_progress_bar(args.files.len() as u64, json_mode);
    let bar = progress.clone();
    let driver = BatchDriver::new(controller, &config).with_progress(Arc::new(move |result: &OptimizationResult| {
        bar.set_message(format!("{} {}", result.input_file.display(), result.outcome));
        bar.inc(1);
    }));

    let summary = driver.run(&args.files).await?;
    progress.finish_and_clear();

    let all_succeeded = summary.all_succeeded();
    let result = RunOutput {
        summary_path: config.batch.output_dir.join(BATCH_SUMMARY),
        summary,
    };
    output(&result, json_mode);
    Ok(all_succeeded)
}
