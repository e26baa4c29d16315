pub mod batch;
pub mod config;
pub mod iteration;
pub mod metrics;
pub mod parameters;
pub mod sample;

pub use batch::BatchSummary;
pub use config::{
    BatchConfig, Config, LoggingConfig, OptimizerConfig, QualityGateConfig, RecommenderConfig,
    RetryConfig, ScoreWeights, ToolsConfig,
};
pub use iteration::{
    Baseline, IterationRecord, OptimizationResult, Outcome, TerminationReason, TrimReport, Verdict,
};
pub use metrics::{ModuleStatus, QualityMetrics, QualitySummary, ReadLength};
pub use parameters::{
    CorrectionKind, FieldCorrection, Proposal, TrimParameters, LENGTH_RANGE, QUALITY_RANGE,
    TRIM_FRONT_RANGE, TRIM_TAIL_RANGE,
};
pub use sample::{is_gzipped, sample_stem};
