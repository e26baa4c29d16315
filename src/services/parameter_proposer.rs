//! Obtains validated trimming parameters from the recommendation service.

use std::sync::Arc;
use tracing::{debug, info, instrument};

use super::json_extraction::extract_json_object;
use super::parameter_schema::ParameterSchema;
use super::prompt_builder::PromptBuilder;
use crate::domain::errors::ProposalError;
use crate::domain::models::{IterationRecord, Proposal, QualityMetrics};
use crate::domain::ports::Recommender;
use crate::infrastructure::retry::RetryPolicy;

/// Prompt, call, extract, validate.
///
/// Only a response with no parseable JSON object at all (after the retry)
/// fails; field-level problems are repaired by [`ParameterSchema`].
pub struct ParameterProposer {
    recommender: Arc<dyn Recommender>,
    prompts: PromptBuilder,
    retry: RetryPolicy,
}

impl ParameterProposer {
    pub fn new(recommender: Arc<dyn Recommender>, prompts: PromptBuilder, retry: RetryPolicy) -> Self {
        Self {
            recommender,
            prompts,
            retry,
        }
    }

    #[instrument(skip_all, fields(model = %self.recommender.model(), round = history.len() + 1))]
    pub async fn propose(
        &self,
        metrics: &QualityMetrics,
        history: &[IterationRecord],
    ) -> Result<Proposal, ProposalError> {
        let proposal = self
            .retry
            .execute(|attempt| self.attempt(metrics, history, attempt))
            .await?;

        info!(
            parameters = %proposal.parameters,
            corrections = proposal.corrections.len(),
            "received parameter proposal"
        );
        Ok(proposal)
    }

    async fn attempt(
        &self,
        metrics: &QualityMetrics,
        history: &[IterationRecord],
        attempt: u32,
    ) -> Result<Proposal, ProposalError> {
        let prompt = self.prompts.build(metrics, history, attempt > 0);
        debug!(attempt, prompt_chars = prompt.len(), "requesting proposal");

        let response = self.recommender.generate(&prompt).await?;
        let object = extract_json_object(&response).ok_or(ProposalError::NoJsonFound)?;
        Ok(ParameterSchema::validate(&object))
    }
}
