//! Common test utilities for integration tests
//!
//! FastQC report builders, sample FASTQ files and a controller wired to the
//! scripted port doubles.

#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempDir;

use trimwise::adapters::mock::{MockAnalysis, MockAnalyzer, MockRecommender, MockTrimmer};
use trimwise::domain::models::Config;
use trimwise::infrastructure::RetryPolicy;
use trimwise::services::prompt_builder::DEFAULT_TEMPLATE;
use trimwise::services::{IterationController, ParameterProposer, PromptBuilder};

/// Create a temporary directory for test isolation
pub fn temp_dir() -> TempDir {
    tempfile::tempdir().expect("Failed to create temp dir")
}

/// Write a two-record FASTQ file.
pub fn write_fastq(dir: &Path, name: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, "@r1\nACGTACGT\n+\nIIIIIIII\n@r2\nGGGGCCCC\n+\nIIIII###\n")
        .expect("Failed to write FASTQ");
    path
}

/// A `fastqc_data.txt` whose per-base means average to `avg` with minimum
/// `min`.
pub fn report(avg: f64, min: f64, adapter: f64, quality_status: &str) -> String {
    let high = 2.0 * avg - min;
    format!(
        ">>Basic Statistics\tpass\n\
         #Measure\tValue\n\
         Total Sequences\t1000\n\
         %GC\t48\n\
         >>END_MODULE\n\
         >>Per base sequence quality\t{quality_status}\n\
         #Base\tMean\tMedian\n\
         1\t{high:.4}\t{high:.4}\n\
         2\t{min:.4}\t{min:.4}\n\
         >>END_MODULE\n\
         >>Adapter Content\tpass\n\
         #Position\tIllumina Universal Adapter\n\
         1\t0.0\n\
         2\t{adapter:.4}\n\
         >>END_MODULE\n"
    )
}

/// Metrics passing every default threshold.
pub fn good() -> MockAnalysis {
    MockAnalysis::Report(report(32.0, 28.0, 1.0, "pass"))
}

/// Unacceptable metrics; a higher `level` scores strictly higher.
pub fn poor(level: u32) -> MockAnalysis {
    let level = f64::from(level);
    MockAnalysis::Report(report(15.0 + level, 8.0 + level, 12.0, "warn"))
}

/// A report the metrics extractor rejects.
pub fn garbage() -> MockAnalysis {
    MockAnalysis::Report("this is not a FastQC report\n".to_string())
}

/// Configuration with short retries and the given round budget.
pub fn config(max_iterations: u32) -> Config {
    let mut config = Config::default();
    config.optimizer.max_iterations = max_iterations;
    config.retry.initial_backoff_ms = 0;
    config.retry.max_backoff_ms = 0;
    config
}

pub fn controller(
    config: &Config,
    analyzer: Arc<MockAnalyzer>,
    trimmer: Arc<MockTrimmer>,
    recommender: Arc<MockRecommender>,
) -> IterationController {
    let proposer = ParameterProposer::new(
        recommender,
        PromptBuilder::new(DEFAULT_TEMPLATE, 8000, 3),
        RetryPolicy::from(&config.retry),
    );
    IterationController::new(config, analyzer, trimmer, Arc::new(proposer))
}

/// Setup test logging
#[allow(dead_code)]
pub fn setup_test_logging() {
    use tracing_subscriber::fmt;

    let _ = fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::DEBUG)
        .try_init();
}
