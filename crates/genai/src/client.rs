use std::time::Duration;

use meridian_core::DeskError;
use tracing::debug;

use crate::discovery::{select_model, SelectedModel};
use crate::types::{GenerateContentRequest, GenerateContentResponse, ModelCatalog};

/// Base URL for the Gemini REST API.
pub const DEFAULT_API_BASE: &str = "https://generativelanguage.googleapis.com";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// HTTP client for the Gemini catalog and completion endpoints.
///
/// One discovery round-trip plus one completion request per draft; there
/// is deliberately no retry or backoff, the caller surfaces errors as-is.
#[derive(Debug, Clone)]
pub struct GeminiClient {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
}

impl GeminiClient {
    pub fn new(api_key: impl Into<String>) -> Result<Self, DeskError> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|error| DeskError::Connection(error.to_string()))?;

        Ok(Self {
            client,
            api_key: api_key.into(),
            base_url: DEFAULT_API_BASE.to_string(),
        })
    }

    /// Overrides the API base URL (tests point this at a mock server).
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    /// Fetches the model catalog and picks a generation model.
    pub async fn discover_model(&self) -> Result<SelectedModel, DeskError> {
        let url = format!("{}/v1beta/models", self.base_url);
        let response = self
            .client
            .get(&url)
            .query(&[("key", self.api_key.as_str())])
            .send()
            .await
            .map_err(|error| DeskError::Connection(error.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(DeskError::Discovery {
                status: status.as_u16(),
            });
        }

        let catalog: ModelCatalog = response
            .json()
            .await
            .map_err(|_| DeskError::MalformedResponse)?;

        let selected = select_model(&catalog.models)?;
        debug!(model = %selected.model_id, reason = ?selected.reason, "model selected");
        Ok(selected)
    }

    /// Issues one completion request against the chosen model.
    pub async fn generate(&self, model_id: &str, prompt: &str) -> Result<String, DeskError> {
        let url = format!("{}/v1beta/models/{}:generateContent", self.base_url, model_id);
        let response = self
            .client
            .post(&url)
            .query(&[("key", self.api_key.as_str())])
            .json(&GenerateContentRequest::from_prompt(prompt))
            .send()
            .await
            .map_err(|error| DeskError::Connection(error.to_string()))?;

        let status = response.status();
        if status.is_success() {
            let payload: GenerateContentResponse = response
                .json()
                .await
                .map_err(|_| DeskError::MalformedResponse)?;
            return payload
                .first_text()
                .map(str::to_string)
                .ok_or(DeskError::MalformedResponse);
        }

        match status.as_u16() {
            429 => Err(DeskError::QuotaExceeded {
                model: model_id.to_string(),
            }),
            404 => Err(DeskError::ModelNotFound {
                model: model_id.to_string(),
            }),
            code => {
                let body = response.text().await.unwrap_or_default();
                Err(DeskError::Provider { status: code, body })
            }
        }
    }
}
