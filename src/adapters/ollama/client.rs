//! HTTP client for a local Ollama server.

use async_trait::async_trait;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

use super::types::{
    ErrorResponse, GenerateOptions, GenerateRequest, GenerateResponse, PullRequest, PullResponse,
    TagsResponse,
};
use crate::domain::errors::ProposalError;
use crate::domain::models::RecommenderConfig;
use crate::domain::ports::{Recommender, ServiceHealth};

/// Downloading a model can take far longer than a generation call.
const PULL_TIMEOUT: Duration = Duration::from_secs(30 * 60);

/// Recommender backed by Ollama's `/api/generate` endpoint.
pub struct OllamaClient {
    http: reqwest::Client,
    base_url: String,
    model: String,
    options: GenerateOptions,
    timeout_secs: u64,
}

impl OllamaClient {
    pub fn new(config: &RecommenderConfig) -> Result<Self, ProposalError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| ProposalError::Unreachable(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            options: GenerateOptions {
                temperature: config.temperature,
                top_p: config.top_p,
            },
            timeout_secs: config.timeout_secs,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Ask the server to download the configured model and wait until it is
    /// installed.
    #[instrument(skip(self), fields(model = %self.model))]
    pub async fn pull_model(&self) -> Result<(), ProposalError> {
        let url = format!("{}/api/pull", self.base_url);
        let body = PullRequest {
            model: &self.model,
            stream: false,
        };

        info!("pulling model");
        let response = self
            .http
            .post(&url)
            .timeout(PULL_TIMEOUT)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ProposalError::Timeout(PULL_TIMEOUT.as_secs())
                } else {
                    self.classify(&e)
                }
            })?;
        let response = Self::check_status(response).await?;
        let parsed: PullResponse = response
            .json()
            .await
            .map_err(|e| ProposalError::InvalidBody(e.to_string()))?;

        if parsed.status != "success" {
            return Err(ProposalError::InvalidBody(format!(
                "pull finished with status {:?}",
                parsed.status
            )));
        }
        info!("model pulled");
        Ok(())
    }

    fn classify(&self, err: &reqwest::Error) -> ProposalError {
        if err.is_timeout() {
            ProposalError::Timeout(self.timeout_secs)
        } else if err.is_decode() {
            ProposalError::InvalidBody(err.to_string())
        } else {
            ProposalError::Unreachable(err.to_string())
        }
    }

    async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, ProposalError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ErrorResponse>(&body)
            .map(|e| e.error)
            .unwrap_or(body);
        Err(ProposalError::Http {
            status: status.as_u16(),
            message,
        })
    }
}

#[async_trait]
impl Recommender for OllamaClient {
    fn model(&self) -> &str {
        &self.model
    }

    #[instrument(skip(self, prompt), fields(model = %self.model, prompt_chars = prompt.len()))]
    async fn generate(&self, prompt: &str) -> Result<String, ProposalError> {
        let url = format!("{}/api/generate", self.base_url);
        let body = GenerateRequest {
            model: &self.model,
            prompt,
            stream: false,
            options: self.options,
        };

        let response = self
            .http
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| self.classify(&e))?;
        let response = Self::check_status(response).await?;

        let parsed: GenerateResponse = response.json().await.map_err(|e| {
            if e.is_timeout() {
                ProposalError::Timeout(self.timeout_secs)
            } else {
                ProposalError::InvalidBody(e.to_string())
            }
        })?;

        if !parsed.done {
            warn!("generation reported as incomplete");
        }
        debug!(response_chars = parsed.response.len(), "received recommendation");
        Ok(parsed.response)
    }

    async fn health_check(&self) -> Result<ServiceHealth, ProposalError> {
        let url = format!("{}/api/tags", self.base_url);
        let response = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|e| self.classify(&e))?;
        let response = Self::check_status(response).await?;
        let tags: TagsResponse = response
            .json()
            .await
            .map_err(|e| ProposalError::InvalidBody(e.to_string()))?;

        let available: Vec<String> = tags.models.into_iter().map(|m| m.name).collect();
        if available.iter().any(|name| name.contains(&self.model)) {
            Ok(ServiceHealth::Ready)
        } else {
            Ok(ServiceHealth::ModelMissing { available })
        }
    }
}
