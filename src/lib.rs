//! Trimwise - iterative FASTQ trimming optimizer
//!
//! Trimwise drives FastQC, fastp and a local language model in a closed loop:
//! analyze a read file, ask for trimming parameters, trim, re-analyze, and
//! keep the best-scoring result until quality targets are met or the round
//! budget runs out.
//!
//! # Architecture
//!
//! This crate follows Hexagonal Architecture principles:
//!
//! - **Domain Layer** (`domain`): models, errors and port traits
//! - **Service Layer** (`services`): metrics extraction, quality gate,
//!   parameter proposal, the iteration controller and the batch driver
//! - **Adapters** (`adapters`): FastQC, fastp, Ollama and scripted test doubles
//! - **Infrastructure Layer** (`infrastructure`): configuration, logging,
//!   retry policy and summary persistence
//! - **CLI Layer** (`cli`): command-line interface
//!
//! # Example
//!
//! ```ignore
//! use trimwise::cli::commands::run::build_controller;
//! use trimwise::domain::models::Config;
//! use trimwise::services::BatchDriver;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::default();
//!     let driver = BatchDriver::new(build_controller(&config)?, &config);
//!     let summary = driver.run(&["sample.fastq".into()]).await?;
//!     println!("{} of {} succeeded", summary.succeeded, summary.total_files);
//!     Ok(())
//! }
//! ```

pub mod adapters;
pub mod cli;
pub mod domain;
pub mod infrastructure;
pub mod services;

pub use domain::models::{Config, OptimizationResult, TerminationReason};
pub use infrastructure::config::{ConfigError, ConfigLoader};
pub use services::{BatchDriver, IterationController};
