//! LKEAP API client
//!
//! Thin wrapper over the two OpenAI-compatible endpoints the pipe needs:
//! `GET /models` and streaming `POST /chat/completions`. Every method returns
//! a typed [`Result`]; converting failures into host-visible data is left to
//! [`crate::pipe::LkeapPipe`].

use crate::config::PipeConfig;
use crate::error::{Error, Result};
use crate::stream::{relay_events, Fragment};
use crate::types::{ChatMessage, ChatRequest, ModelDescriptor};
use futures::stream::Stream;
use reqwest::{Client, Response};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;

/// LKEAP API client
#[derive(Clone)]
pub struct LkeapClient {
    /// HTTP client
    client: Client,
    /// Configuration
    config: Arc<PipeConfig>,
}

impl LkeapClient {
    /// Create a new client from environment variables
    pub fn from_env() -> Result<Self> {
        let config = PipeConfig::from_env()?;
        Self::new(config)
    }

    /// Create a new client with the given configuration
    pub fn new(config: PipeConfig) -> Result<Self> {
        Self::with_shared_config(Arc::new(config))
    }

    /// Create a new client sharing an existing configuration
    pub fn with_shared_config(config: Arc<PipeConfig>) -> Result<Self> {
        let mut builder = Client::builder();
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }

        Ok(Self {
            client: builder.build()?,
            config,
        })
    }

    /// Fetch the remote model catalog, named with the configured prefix
    pub async fn list_models(&self) -> Result<Vec<ModelDescriptor>> {
        if !self.config.has_api_key() {
            return Err(Error::MissingApiKey);
        }

        let url = self.config.endpoint("models");
        debug!(%url, "fetching model catalog");

        let response = self
            .client
            .get(&url)
            .header("Authorization", format!("Bearer {}", self.config.api_key()))
            .header("Content-Type", "application/json")
            .send()
            .await?;

        let response = check_status(response).await?;
        let models: ModelsResponse = response.json().await?;

        Ok(models
            .data
            .into_iter()
            .map(|model| {
                let display = model.name.unwrap_or_else(|| model.id.clone());
                ModelDescriptor::new(model.id, format!("{}{}", self.config.name_prefix, display))
            })
            .collect())
    }

    /// Open a streaming chat completion and return the raw response
    pub async fn open_chat_stream(&self, request: &ChatRequest) -> Result<Response> {
        if !self.config.has_api_key() {
            return Err(Error::MissingApiKey);
        }

        let url = self.config.endpoint("chat/completions");
        let body = CompletionRequest {
            model: request.model_id(),
            messages: &request.messages,
            stream: true,
        };
        debug!(%url, model = body.model, messages = body.messages.len(), "opening chat stream");

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.config.api_key()))
            .json(&body)
            .send()
            .await?;

        check_status(response).await
    }

    /// Stream a chat completion as tagged fragments
    pub async fn stream_chat(
        &self,
        request: &ChatRequest,
    ) -> Result<impl Stream<Item = Result<Fragment>> + Send> {
        let response = self.open_chat_stream(request).await?;
        Ok(relay_events(response.bytes_stream()))
    }

    /// Get the configuration
    pub fn config(&self) -> &PipeConfig {
        &self.config
    }
}

/// Turn a non-success status into [`Error::Api`], preferring the message of
/// an OpenAI-style error body.
async fn check_status(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let error_text = response
        .text()
        .await
        .unwrap_or_else(|_| "Unknown error".to_string());
    let message = serde_json::from_str::<ErrorResponse>(&error_text)
        .map(|body| body.error.message)
        .unwrap_or(error_text);

    Err(Error::api(status.as_u16(), message))
}

/// Body of a streaming chat completion request
#[derive(Debug, Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    stream: bool,
}

/// Model catalog response
#[derive(Debug, Clone, Deserialize)]
pub struct ModelsResponse {
    /// Available models, in API order
    pub data: Vec<ModelInfo>,
}

/// Catalog entry
#[derive(Debug, Clone, Deserialize)]
pub struct ModelInfo {
    /// Model ID
    pub id: String,
    /// Display name, when the API provides one
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    error: ErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ErrorDetail {
    message: String,
}
