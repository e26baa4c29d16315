//! Recommendation port - interface for the parameter-recommendation service.

use async_trait::async_trait;

use crate::domain::errors::ProposalError;

/// Service health as reported by [`Recommender::health_check`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServiceHealth {
    /// Reachable and the configured model is installed
    Ready,
    /// Reachable but the configured model is missing
    ModelMissing { available: Vec<String> },
}

/// A text-in, text-out recommendation service.
#[async_trait]
pub trait Recommender: Send + Sync {
    /// Model identifier sent with each request.
    fn model(&self) -> &str;

    /// Send `prompt` and return the raw response text.
    ///
    /// The text is free-form; extracting parameters from it is the caller's
    /// concern.
    async fn generate(&self, prompt: &str) -> Result<String, ProposalError>;

    async fn health_check(&self) -> Result<ServiceHealth, ProposalError>;
}
