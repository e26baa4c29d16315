//! Port trait definitions (Hexagonal Architecture)
//!
//! This module defines async trait interfaces that infrastructure adapters must implement:
//! - QualityAnalyzer: quality report generation (FastQC)
//! - Trimmer: read trimming (fastp)
//! - Recommender: parameter recommendation (Ollama)
//!
//! These traits keep the iteration controller independent of the concrete
//! tools, and let tests drive it with scripted doubles.

pub mod quality_analyzer;
pub mod recommender;
pub mod trimmer;

pub use quality_analyzer::QualityAnalyzer;
pub use recommender::{Recommender, ServiceHealth};
pub use trimmer::{TrimOutcome, TrimRequest, Trimmer};
