//! Optimization services: the decision logic between the ports.

pub mod batch_driver;
pub mod iteration_controller;
pub mod json_extraction;
pub mod metrics_extractor;
pub mod parameter_proposer;
pub mod parameter_schema;
pub mod prompt_builder;
pub mod quality_gate;

pub use batch_driver::{BatchDriver, ProgressCallback};
pub use iteration_controller::IterationController;
pub use json_extraction::extract_json_object;
pub use metrics_extractor::MetricsExtractor;
pub use parameter_proposer::ParameterProposer;
pub use parameter_schema::ParameterSchema;
pub use prompt_builder::PromptBuilder;
pub use quality_gate::{GateVerdict, QualityGate};
