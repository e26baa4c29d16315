//! fastp trimming adapter.

use async_trait::async_trait;
use serde_json::Value;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, instrument, warn};

use super::process::{responds_to_version, run_tool};
use crate::domain::errors::ExecutionError;
use crate::domain::models::{ToolsConfig, TrimParameters, TrimReport};
use crate::domain::ports::{TrimOutcome, TrimRequest, Trimmer};
use crate::infrastructure::retry::RetryPolicy;

const TOOL: &str = "fastp";

/// Runs fastp with parameters mapped onto its native flags.
pub struct FastpTrimmer {
    binary: String,
    threads: u32,
    timeout: Duration,
    retry: RetryPolicy,
}

impl FastpTrimmer {
    pub fn new(config: &ToolsConfig, retry: RetryPolicy) -> Self {
        Self {
            binary: config.fastp_binary.clone(),
            threads: config.threads,
            timeout: Duration::from_secs(config.trim_timeout_secs),
            retry,
        }
    }

    /// Paths of the JSON and HTML reports for a given output file.
    pub fn report_paths(output: &Path, report_dir: &Path) -> (PathBuf, PathBuf) {
        let stem = output
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "trimmed".to_string());
        (
            report_dir.join(format!("{stem}_fastp.json")),
            report_dir.join(format!("{stem}_fastp.html")),
        )
    }

    pub fn build_args(&self, request: &TrimRequest) -> Vec<OsString> {
        let TrimParameters {
            quality,
            length,
            trim_front,
            trim_tail,
            adapter_trim,
            poly_g_trim,
        } = request.parameters;
        let (json_report, html_report) = Self::report_paths(&request.output, &request.report_dir);

        let mut args: Vec<OsString> = vec![
            "-i".into(),
            request.input.as_os_str().to_owned(),
            "-o".into(),
            request.output.as_os_str().to_owned(),
            "--qualified_quality_phred".into(),
            quality.to_string().into(),
            "--length_required".into(),
            length.to_string().into(),
        ];

        if trim_front > 0 {
            args.push("--trim_front1".into());
            args.push(trim_front.to_string().into());
        }
        if trim_tail > 0 {
            args.push("--trim_tail1".into());
            args.push(trim_tail.to_string().into());
        }

        // Single-end adapter detection is on by default in fastp
        if !adapter_trim {
            args.push("--disable_adapter_trimming".into());
        }

        args.push(if poly_g_trim {
            "--trim_poly_g".into()
        } else {
            "--disable_trim_poly_g".into()
        });

        args.extend([
            "--json".into(),
            json_report.into_os_string(),
            "--html".into(),
            html_report.into_os_string(),
            "--thread".into(),
            self.threads.to_string().into(),
        ]);

        args
    }
}

/// Extract read counts from a fastp JSON report.
pub fn parse_trim_report(json: &Value) -> TrimReport {
    let count = |pointer: &str| json.pointer(pointer).and_then(Value::as_u64);

    TrimReport {
        reads_before: count("/summary/before_filtering/total_reads"),
        reads_after: count("/summary/after_filtering/total_reads"),
        low_quality_reads: count("/filtering_result/low_quality_reads"),
        too_many_n_reads: count("/filtering_result/too_many_N_reads"),
        too_short_reads: count("/filtering_result/too_short_reads"),
        adapter_trimmed_reads: count("/adapter_cutting/adapter_trimmed_reads"),
    }
}

async fn read_trim_report(path: &Path) -> TrimReport {
    let raw = match tokio::fs::read_to_string(path).await {
        Ok(raw) => raw,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "fastp report unavailable");
            return TrimReport::default();
        }
    };
    match serde_json::from_str::<Value>(&raw) {
        Ok(json) => parse_trim_report(&json),
        Err(e) => {
            warn!(path = %path.display(), error = %e, "fastp report is not valid JSON");
            TrimReport::default()
        }
    }
}

#[async_trait]
impl Trimmer for FastpTrimmer {
    fn name(&self) -> &'static str {
        TOOL
    }

    #[instrument(skip(self, request), fields(input = %request.input.display(), params = %request.parameters))]
    async fn trim(&self, request: &TrimRequest) -> Result<TrimOutcome, ExecutionError> {
        tokio::fs::create_dir_all(&request.report_dir)
            .await
            .map_err(|e| ExecutionError::Io {
                tool: TOOL.to_string(),
                reason: format!("creating {}: {e}", request.report_dir.display()),
            })?;

        let args = self.build_args(request);
        self.retry
            .execute(|_| run_tool(TOOL, &self.binary, &args, self.timeout))
            .await?;

        if !tokio::fs::try_exists(&request.output).await.unwrap_or(false) {
            return Err(ExecutionError::MissingOutput {
                tool: TOOL.to_string(),
                path: request.output.clone(),
            });
        }

        let (json_report, _) = Self::report_paths(&request.output, &request.report_dir);
        let report = read_trim_report(&json_report).await;
        info!(
            reads_before = report.reads_before,
            reads_after = report.reads_after,
            retention = report.retention_rate(),
            "trimming finished"
        );

        Ok(TrimOutcome {
            output_file: request.output.clone(),
            report,
        })
    }

    async fn is_available(&self) -> bool {
        responds_to_version(&self.binary).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn request(parameters: TrimParameters) -> TrimRequest {
        TrimRequest {
            input: PathBuf::from("raw.fastq"),
            output: PathBuf::from("work/round1.fastq"),
            parameters,
            report_dir: PathBuf::from("work/reports"),
        }
    }

    fn as_strings(args: &[OsString]) -> Vec<String> {
        args.iter()
            .map(|a| a.to_string_lossy().into_owned())
            .collect()
    }

    #[test]
    fn test_build_args_defaults() {
        let trimmer = FastpTrimmer::new(&ToolsConfig::default(), RetryPolicy::none());
        let args = as_strings(&trimmer.build_args(&request(TrimParameters::default())));

        assert_eq!(
            &args[..8],
            &[
                "-i",
                "raw.fastq",
                "-o",
                "work/round1.fastq",
                "--qualified_quality_phred",
                "20",
                "--length_required",
                "35",
            ]
        );
        assert!(!args.contains(&"--trim_front1".to_string()));
        assert!(!args.contains(&"--trim_tail1".to_string()));
        assert!(!args.contains(&"--disable_adapter_trimming".to_string()));
        assert!(args.contains(&"--disable_trim_poly_g".to_string()));
        assert!(args.contains(&"work/reports/round1_fastp.json".to_string()));
        assert_eq!(args.last().map(String::as_str), Some("4"));
    }

    #[test]
    fn test_build_args_all_toggles() {
        let trimmer = FastpTrimmer::new(&ToolsConfig::default(), RetryPolicy::none());
        let params = TrimParameters {
            quality: 28,
            length: 50,
            trim_front: 5,
            trim_tail: 10,
            adapter_trim: false,
            poly_g_trim: true,
        };
        let args = as_strings(&trimmer.build_args(&request(params)));

        let pos = args.iter().position(|a| a == "--trim_front1").unwrap();
        assert_eq!(args[pos + 1], "5");
        let pos = args.iter().position(|a| a == "--trim_tail1").unwrap();
        assert_eq!(args[pos + 1], "10");
        assert!(args.contains(&"--disable_adapter_trimming".to_string()));
        assert!(args.contains(&"--trim_poly_g".to_string()));
    }

    #[test]
    fn test_parse_trim_report() {
        let report = parse_trim_report(&json!({
            "summary": {
                "before_filtering": {"total_reads": 10000},
                "after_filtering": {"total_reads": 9200}
            },
            "filtering_result": {
                "passed_filter_reads": 9200,
                "low_quality_reads": 500,
                "too_many_N_reads": 100,
                "too_short_reads": 200
            },
            "adapter_cutting": {"adapter_trimmed_reads": 1500}
        }));

        assert_eq!(report.reads_before, Some(10000));
        assert_eq!(report.reads_after, Some(9200));
        assert_eq!(report.too_many_n_reads, Some(100));
        assert_eq!(report.adapter_trimmed_reads, Some(1500));
        assert_eq!(report.reads_discarded(), Some(800));
    }

    #[test]
    fn test_parse_trim_report_tolerates_missing_sections() {
        let report = parse_trim_report(&json!({"summary": {}}));
        assert_eq!(report, TrimReport::default());
    }

    #[tokio::test]
    async fn test_read_trim_report_invalid_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.json");
        std::fs::write(&path, "not json").unwrap();
        assert_eq!(read_trim_report(&path).await, TrimReport::default());
    }
}
