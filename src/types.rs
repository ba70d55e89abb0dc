//! Core type definitions shared between the pipe and its host

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Identifier of the placeholder entry returned when listing fails
pub const ERROR_MODEL_ID: &str = "error";

/// Placeholder name shown when no API key is configured
pub const MISSING_API_KEY_NAME: &str = "API Key not provided.";

/// Placeholder name shown when the remote catalog cannot be fetched
pub const FETCH_FAILED_NAME: &str = "Error fetching models. Please check your API Key.";

/// Unique identifier for a relayed chat request, used in logs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RequestId(Uuid);

impl RequestId {
    /// Create a new random request ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for RequestId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A selectable model as shown in the host's model picker
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelDescriptor {
    /// Remote model identifier
    pub id: String,
    /// Display name, including the configured prefix
    pub name: String,
}

impl ModelDescriptor {
    /// Create a model descriptor
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }

    /// Create the placeholder entry signalling a listing problem
    pub fn error(name: impl Into<String>) -> Self {
        Self::new(ERROR_MODEL_ID, name)
    }

    /// Whether this is a placeholder rather than a real model
    pub fn is_error(&self) -> bool {
        self.id == ERROR_MODEL_ID
    }
}

/// Outcome of listing the remote model catalog
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModelListing {
    /// Models in the order the API returned them
    Models(Vec<ModelDescriptor>),
    /// No API key is configured
    MissingApiKey,
    /// The catalog request or its decoding failed
    FetchFailed,
}

impl ModelListing {
    /// Convert into the list the host renders, using a single placeholder
    /// entry for the failure variants.
    pub fn into_descriptors(self) -> Vec<ModelDescriptor> {
        match self {
            Self::Models(models) => models,
            Self::MissingApiKey => vec![ModelDescriptor::error(MISSING_API_KEY_NAME)],
            Self::FetchFailed => vec![ModelDescriptor::error(FETCH_FAILED_NAME)],
        }
    }
}

/// Message in a conversation, forwarded to the API verbatim
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Role of the message sender
    pub role: String,
    /// Message content (plain text or a list of content parts)
    #[serde(default)]
    pub content: serde_json::Value,
    /// Any other fields the host attached
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl ChatMessage {
    /// Create a message with text content
    pub fn new(role: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: role.into(),
            content: serde_json::Value::String(content.into()),
            extra: serde_json::Map::new(),
        }
    }

    /// Create a system message
    pub fn system(content: impl Into<String>) -> Self {
        Self::new("system", content)
    }

    /// Create a user message
    pub fn user(content: impl Into<String>) -> Self {
        Self::new("user", content)
    }

    /// Create an assistant message
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new("assistant", content)
    }
}

/// Chat request as received from the host
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatRequest {
    /// Model identifier, possibly carrying a host routing prefix
    pub model: String,
    /// Conversation history
    pub messages: Vec<ChatMessage>,
}

impl ChatRequest {
    /// Create a new chat request
    pub fn new(model: impl Into<String>, messages: Vec<ChatMessage>) -> Self {
        Self {
            model: model.into(),
            messages,
        }
    }

    /// Model identifier with the host routing prefix removed
    pub fn model_id(&self) -> &str {
        normalize_model_id(&self.model)
    }
}

/// Strip a host routing prefix such as `test.` from a model id.
///
/// Everything up to and including the first `.` is dropped; ids without a
/// `.` are returned unchanged.
pub fn normalize_model_id(model: &str) -> &str {
    match model.split_once('.') {
        Some((_, rest)) => rest,
        None => model,
    }
}
