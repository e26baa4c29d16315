use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Main configuration structure for trimwise
///
/// Passed explicitly into every controller so concurrent workers never share
/// mutable settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Config {
    /// Iteration controller configuration
    #[serde(default)]
    pub optimizer: OptimizerConfig,

    /// Acceptance thresholds and score weights
    #[serde(default)]
    pub quality_gate: QualityGateConfig,

    /// Recommendation service configuration
    #[serde(default)]
    pub recommender: RecommenderConfig,

    /// External tool configuration
    #[serde(default)]
    pub tools: ToolsConfig,

    /// Retry policy configuration
    #[serde(default)]
    pub retry: RetryConfig,

    /// Batch execution configuration
    #[serde(default)]
    pub batch: BatchConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Iteration controller configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct OptimizerConfig {
    /// Maximum trimming rounds per file
    #[serde(default = "default_max_iterations")]
    pub max_iterations: u32,

    /// Consecutive non-improving rounds tolerated before stopping
    #[serde(default = "default_no_improvement_tolerance")]
    pub no_improvement_tolerance: u32,

    /// Wall-clock budget for one file in seconds
    #[serde(default = "default_per_file_timeout_secs")]
    pub per_file_timeout_secs: u64,

    /// Keep superseded round outputs for inspection
    #[serde(default)]
    pub keep_intermediate: bool,
}

const fn default_max_iterations() -> u32 {
    3
}

const fn default_no_improvement_tolerance() -> u32 {
    1
}

const fn default_per_file_timeout_secs() -> u64 {
    3600
}

impl Default for OptimizerConfig {
    fn default() -> Self {
        Self {
            max_iterations: default_max_iterations(),
            no_improvement_tolerance: default_no_improvement_tolerance(),
            per_file_timeout_secs: default_per_file_timeout_secs(),
            keep_intermediate: false,
        }
    }
}

/// Quality gate thresholds
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct QualityGateConfig {
    /// Floor for the mean per-base quality
    #[serde(default = "default_min_average_quality")]
    pub min_average_quality: f64,

    /// Floor for the lowest per-base mean quality
    #[serde(default = "default_min_min_quality")]
    pub min_min_quality: f64,

    /// Ceiling for adapter contamination, in percent
    #[serde(default = "default_max_adapter_contamination")]
    pub max_adapter_contamination: f64,

    /// Relative weights of the score signals
    #[serde(default)]
    pub weights: ScoreWeights,
}

const fn default_min_average_quality() -> f64 {
    25.0
}

const fn default_min_min_quality() -> f64 {
    20.0
}

const fn default_max_adapter_contamination() -> f64 {
    5.0
}

impl Default for QualityGateConfig {
    fn default() -> Self {
        Self {
            min_average_quality: default_min_average_quality(),
            min_min_quality: default_min_min_quality(),
            max_adapter_contamination: default_max_adapter_contamination(),
            weights: ScoreWeights::default(),
        }
    }
}

/// Weights of the individual score signals
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct ScoreWeights {
    #[serde(default = "default_average_weight")]
    pub average_quality: f64,
    #[serde(default = "default_min_weight")]
    pub min_quality: f64,
    #[serde(default = "default_adapter_weight")]
    pub adapter: f64,
    #[serde(default = "default_module_weight")]
    pub module_health: f64,
}

const fn default_average_weight() -> f64 {
    0.35
}

const fn default_min_weight() -> f64 {
    0.25
}

const fn default_adapter_weight() -> f64 {
    0.20
}

const fn default_module_weight() -> f64 {
    0.20
}

impl Default for ScoreWeights {
    fn default() -> Self {
        Self {
            average_quality: default_average_weight(),
            min_quality: default_min_weight(),
            adapter: default_adapter_weight(),
            module_health: default_module_weight(),
        }
    }
}

impl ScoreWeights {
    pub fn total(&self) -> f64 {
        self.average_quality + self.min_quality + self.adapter + self.module_health
    }
}

/// Recommendation service configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct RecommenderConfig {
    /// Base URL of the Ollama server
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Model identifier sent with every request
    #[serde(default = "default_model")]
    pub model: String,

    /// Per-call timeout in seconds
    #[serde(default = "default_recommender_timeout_secs")]
    pub timeout_secs: u64,

    #[serde(default = "default_temperature")]
    pub temperature: f64,

    #[serde(default = "default_top_p")]
    pub top_p: f64,

    /// Custom prompt template file (built-in template when unset)
    #[serde(default)]
    pub prompt_template: Option<PathBuf>,

    /// Upper bound on the prompt size in characters
    #[serde(default = "default_max_prompt_chars")]
    pub max_prompt_chars: usize,

    /// Number of prior rounds summarized in the prompt
    #[serde(default = "default_history_window")]
    pub history_window: usize,
}

fn default_base_url() -> String {
    "http://localhost:11434".to_string()
}

fn default_model() -> String {
    "llama3:8b".to_string()
}

const fn default_recommender_timeout_secs() -> u64 {
    60
}

const fn default_temperature() -> f64 {
    0.1
}

const fn default_top_p() -> f64 {
    0.9
}

const fn default_max_prompt_chars() -> usize {
    8000
}

const fn default_history_window() -> usize {
    3
}

impl Default for RecommenderConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            model: default_model(),
            timeout_secs: default_recommender_timeout_secs(),
            temperature: default_temperature(),
            top_p: default_top_p(),
            prompt_template: None,
            max_prompt_chars: default_max_prompt_chars(),
            history_window: default_history_window(),
        }
    }
}

/// External tool configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct ToolsConfig {
    /// Path to the FastQC binary
    #[serde(default = "default_fastqc_binary")]
    pub fastqc_binary: String,

    /// Path to the fastp binary
    #[serde(default = "default_fastp_binary")]
    pub fastp_binary: String,

    /// Threads handed to each tool invocation
    #[serde(default = "default_threads")]
    pub threads: u32,

    /// FastQC per-call timeout in seconds
    #[serde(default = "default_analysis_timeout_secs")]
    pub analysis_timeout_secs: u64,

    /// fastp per-call timeout in seconds
    #[serde(default = "default_trim_timeout_secs")]
    pub trim_timeout_secs: u64,
}

fn default_fastqc_binary() -> String {
    "fastqc".to_string()
}

fn default_fastp_binary() -> String {
    "fastp".to_string()
}

const fn default_threads() -> u32 {
    4
}

const fn default_analysis_timeout_secs() -> u64 {
    300
}

const fn default_trim_timeout_secs() -> u64 {
    600
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            fastqc_binary: default_fastqc_binary(),
            fastp_binary: default_fastp_binary(),
            threads: default_threads(),
            analysis_timeout_secs: default_analysis_timeout_secs(),
            trim_timeout_secs: default_trim_timeout_secs(),
        }
    }
}

/// Retry policy configuration, shared by the service call and tool invocations
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct RetryConfig {
    /// Maximum number of retry attempts after the first call
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Initial backoff delay in milliseconds
    #[serde(default = "default_initial_backoff_ms")]
    pub initial_backoff_ms: u64,

    /// Maximum backoff delay in milliseconds
    #[serde(default = "default_max_backoff_ms")]
    pub max_backoff_ms: u64,
}

const fn default_max_retries() -> u32 {
    1
}

const fn default_initial_backoff_ms() -> u64 {
    500
}

const fn default_max_backoff_ms() -> u64 {
    5_000
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            initial_backoff_ms: default_initial_backoff_ms(),
            max_backoff_ms: default_max_backoff_ms(),
        }
    }
}

/// Batch execution configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct BatchConfig {
    /// Number of files optimized concurrently
    #[serde(default = "default_workers")]
    pub workers: usize,

    /// Root directory for per-file working directories and summaries
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
}

const fn default_workers() -> usize {
    2
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("trimwise_output")
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            workers: default_workers(),
            output_dir: default_output_dir(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct LoggingConfig {
    /// Log level: trace, debug, info, warn, error
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log format: json or pretty
    #[serde(default = "default_log_format")]
    pub format: String,

    /// Directory for rolling log files (stderr only when unset)
    #[serde(default)]
    pub log_dir: Option<PathBuf>,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
            log_dir: None,
        }
    }
}
