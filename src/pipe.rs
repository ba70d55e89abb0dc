//! Host-facing pipe interface
//!
//! The host application only knows how to render a list of selectable models
//! and a sequence of text fragments. [`ChatPipe`] is that contract: neither
//! method can fail, every error is turned into a placeholder model entry or a
//! single error block fragment.

use crate::client::LkeapClient;
use crate::config::PipeConfig;
use crate::error::{Error, Result};
use crate::stream::Fragment;
use crate::tracing_ext::RelaySummary;
use crate::types::{ChatRequest, ModelDescriptor, ModelListing, RequestId};
use async_stream::{stream, try_stream};
use async_trait::async_trait;
use futures::stream::{Stream, StreamExt};
use std::pin::Pin;
use tracing::{debug, warn};

/// Text fragments relayed to the host
pub type FragmentStream = Pin<Box<dyn Stream<Item = String> + Send>>;

/// Plugin interface expected by the host chat application
#[async_trait]
pub trait ChatPipe: Send + Sync {
    /// Models to offer in the host's model picker
    async fn list_models(&self) -> Vec<ModelDescriptor>;

    /// Relay one chat request.
    ///
    /// Nothing is sent until the stream is first polled. Dropping the stream
    /// releases the underlying connection.
    fn stream_chat(&self, request: ChatRequest) -> FragmentStream;

    /// Get the pipe type for debugging/logging
    fn pipe_type(&self) -> &str;
}

/// Pipe backed by the TencentCloud LKEAP API
#[derive(Clone)]
pub struct LkeapPipe {
    client: LkeapClient,
}

impl LkeapPipe {
    /// Create a pipe from environment variables
    pub fn from_env() -> Result<Self> {
        Ok(Self::with_client(LkeapClient::from_env()?))
    }

    /// Create a pipe with the given configuration
    pub fn new(config: PipeConfig) -> Result<Self> {
        Ok(Self::with_client(LkeapClient::new(config)?))
    }

    /// Create a pipe around an existing client
    pub fn with_client(client: LkeapClient) -> Self {
        Self { client }
    }

    /// Get the configuration
    pub fn config(&self) -> &PipeConfig {
        self.client.config()
    }

    /// List models, keeping the failure cause as a variant
    pub async fn models(&self) -> ModelListing {
        match self.client.list_models().await {
            Ok(models) => {
                debug!(count = models.len(), "fetched model catalog");
                ModelListing::Models(models)
            }
            Err(Error::MissingApiKey) => ModelListing::MissingApiKey,
            Err(err) => {
                warn!(error = %err, "failed to fetch model catalog");
                ModelListing::FetchFailed
            }
        }
    }

    /// Relay a chat request as typed fragments, ending after the first error
    pub fn fragments(&self, request: ChatRequest) -> impl Stream<Item = Result<Fragment>> + Send {
        let client = self.client.clone();
        try_stream! {
            let events = client.stream_chat(&request).await?;
            let mut events = Box::pin(events);
            while let Some(fragment) = events.next().await {
                yield fragment?;
            }
        }
    }
}

#[async_trait]
impl ChatPipe for LkeapPipe {
    #[tracing::instrument(skip(self), fields(base_url = %self.config().base_url))]
    async fn list_models(&self) -> Vec<ModelDescriptor> {
        self.models().await.into_descriptors()
    }

    fn stream_chat(&self, request: ChatRequest) -> FragmentStream {
        let mut summary = RelaySummary::new(RequestId::new(), request.model_id());
        let fragments = self.fragments(request);

        Box::pin(stream! {
            let mut fragments = Box::pin(fragments);
            while let Some(item) = fragments.next().await {
                match item {
                    Ok(fragment) => {
                        summary.record(&fragment);
                        yield fragment.into_string();
                    }
                    Err(err) => {
                        warn!(request_id = %summary.request_id, error = %err, "chat relay failed");
                        summary.failed = true;
                        yield err.to_block();
                        break;
                    }
                }
            }
            summary.finish();
        })
    }

    fn pipe_type(&self) -> &str {
        "lkeap"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ChatMessage;
    use url::Url;

    fn pipe_for(base_url: &str, api_key: &str) -> LkeapPipe {
        let config = PipeConfig::new(api_key).with_base_url(Url::parse(base_url).unwrap());
        LkeapPipe::new(config).unwrap()
    }

    #[tokio::test]
    async fn test_list_models_without_key() {
        let pipe = pipe_for("http://127.0.0.1:1", "");
        assert_eq!(pipe.models().await, ModelListing::MissingApiKey);
        assert_eq!(
            pipe.list_models().await,
            vec![ModelDescriptor::new("error", "API Key not provided.")]
        );
    }

    #[tokio::test]
    async fn test_list_models_unreachable_host() {
        let pipe = pipe_for("http://127.0.0.1:1", "sk-test");
        assert_eq!(
            pipe.list_models().await,
            vec![ModelDescriptor::new(
                "error",
                "Error fetching models. Please check your API Key."
            )]
        );
    }

    #[tokio::test]
    async fn test_stream_chat_unreachable_host_yields_one_block() {
        let pipe = pipe_for("http://127.0.0.1:1", "sk-test");
        let request = ChatRequest::new("deepseek-r1", vec![ChatMessage::user("hi")]);

        let fragments: Vec<String> = pipe.stream_chat(request).collect().await;

        assert_eq!(fragments.len(), 1);
        assert!(fragments[0].starts_with("```json\n{\n  \"error\": \"HTTP error: "));
        assert!(fragments[0].ends_with("\",\n}\n```\n"));
    }

    #[tokio::test]
    async fn test_stream_chat_without_key() {
        let pipe = pipe_for("http://127.0.0.1:1", "");
        let request = ChatRequest::new("deepseek-r1", vec![ChatMessage::user("hi")]);

        let fragments: Vec<String> = pipe.stream_chat(request).collect().await;

        assert_eq!(
            fragments,
            vec!["```json\n{\n  \"error\": \"API Key not provided.\",\n}\n```\n"]
        );
    }

    #[test]
    fn test_pipe_type() {
        assert_eq!(pipe_for("http://127.0.0.1:1", "").pipe_type(), "lkeap");
    }
}
