//! Domain layer for the trimming optimizer
//!
//! This module contains the core data model, the error taxonomy and the port
//! traits implemented by the external collaborators.

pub mod errors;
pub mod models;
pub mod ports;

// Re-export error types for convenient access
pub use errors::{ExecutionError, OptimizerError, ParseError, ProposalError};
