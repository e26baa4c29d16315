//! FastQC quality-analysis adapter.

use async_trait::async_trait;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, instrument};

use super::process::{responds_to_version, run_tool};
use crate::domain::errors::ExecutionError;
use crate::domain::models::{sample_stem, ToolsConfig};
use crate::domain::ports::QualityAnalyzer;
use crate::infrastructure::retry::RetryPolicy;

const TOOL: &str = "fastqc";
const REPORT_FILE: &str = "fastqc_data.txt";

/// Runs FastQC with `--extract` and locates `fastqc_data.txt`.
pub struct FastQcAnalyzer {
    binary: String,
    threads: u32,
    timeout: Duration,
    retry: RetryPolicy,
}

impl FastQcAnalyzer {
    pub fn new(config: &ToolsConfig, retry: RetryPolicy) -> Self {
        Self {
            binary: config.fastqc_binary.clone(),
            threads: config.threads,
            timeout: Duration::from_secs(config.analysis_timeout_secs),
            retry,
        }
    }

    fn build_args(&self, input: &Path, output_dir: &Path) -> Vec<OsString> {
        vec![
            input.as_os_str().to_owned(),
            "-o".into(),
            output_dir.as_os_str().to_owned(),
            "-t".into(),
            self.threads.to_string().into(),
            "--quiet".into(),
            "--extract".into(),
        ]
    }
}

/// FastQC names its output directory after the input with sequence
/// extensions removed: `sample.fastq.gz` becomes `sample_fastqc`.
pub fn report_base_name(input: &Path) -> String {
    sample_stem(input)
}

/// Find the report for `input` under `output_dir`, falling back to any
/// `*_fastqc/fastqc_data.txt` in the directory.
pub fn locate_report(input: &Path, output_dir: &Path) -> Option<PathBuf> {
    let expected = output_dir
        .join(format!("{}_fastqc", report_base_name(input)))
        .join(REPORT_FILE);
    if expected.is_file() {
        return Some(expected);
    }

    let entries = std::fs::read_dir(output_dir).ok()?;
    let mut candidates: Vec<PathBuf> = entries
        .filter_map(Result::ok)
        .map(|e| e.path())
        .filter(|p| {
            p.is_dir()
                && p
                    .file_name()
                    .is_some_and(|n| n.to_string_lossy().ends_with("_fastqc"))
        })
        .map(|p| p.join(REPORT_FILE))
        .filter(|p| p.is_file())
        .collect();
    candidates.sort();
    candidates.into_iter().next()
}

#[async_trait]
impl QualityAnalyzer for FastQcAnalyzer {
    fn name(&self) -> &'static str {
        TOOL
    }

    #[instrument(skip(self), fields(input = %input.display()))]
    async fn analyze(&self, input: &Path, output_dir: &Path) -> Result<PathBuf, ExecutionError> {
        tokio::fs::create_dir_all(output_dir)
            .await
            .map_err(|e| ExecutionError::Io {
                tool: TOOL.to_string(),
                reason: format!("creating {}: {e}", output_dir.display()),
            })?;

        let args = self.build_args(input, output_dir);
        self.retry
            .execute(|_| run_tool(TOOL, &self.binary, &args, self.timeout))
            .await?;

        let report = locate_report(input, output_dir).ok_or_else(|| {
            ExecutionError::MissingOutput {
                tool: TOOL.to_string(),
                path: output_dir.join(REPORT_FILE),
            }
        })?;
        debug!(report = %report.display(), "quality report ready");
        Ok(report)
    }

    async fn is_available(&self) -> bool {
        responds_to_version(&self.binary).await
    }
}
