//! Error types for the LKEAP pipe

use thiserror::Error;

/// Result type alias for pipe operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the LKEAP pipe
///
/// None of these ever reach the host: [`crate::pipe::ChatPipe`] turns them
/// into sentinel descriptors or [`json_error_block`] fragments.
#[derive(Debug, Error)]
pub enum Error {
    /// Non-success HTTP status from the LKEAP API
    #[error("Request failed with status {status}: {message}")]
    Api {
        /// HTTP status code
        status: u16,
        /// Message from the error body, or the raw body
        message: String,
    },

    /// Error payload sent in-band instead of an SSE stream
    #[error("{0}")]
    Remote(String),

    /// HTTP request error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Server-sent event decoding error
    #[error("Stream error: {0}")]
    Stream(String),

    /// No API key configured
    #[error("API Key not provided.")]
    MissingApiKey,

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Create an API status error
    pub fn api(status: u16, message: impl Into<String>) -> Self {
        Self::Api {
            status,
            message: message.into(),
        }
    }

    /// Create an in-band remote error
    pub fn remote(msg: impl Into<String>) -> Self {
        Self::Remote(msg.into())
    }

    /// Create a stream decoding error
    pub fn stream(msg: impl Into<String>) -> Self {
        Self::Stream(msg.into())
    }

    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Text shown to the user inside an error block.
    ///
    /// Remote-supplied messages are passed through untouched, everything else
    /// uses the display text.
    pub fn message(&self) -> String {
        match self {
            Self::Api { message, .. } | Self::Remote(message) => message.clone(),
            other => other.to_string(),
        }
    }

    /// Render this error as a host-visible fragment
    pub fn to_block(&self) -> String {
        json_error_block(&self.message())
    }
}

impl From<config::ConfigError> for Error {
    fn from(err: config::ConfigError) -> Self {
        Self::Config(err.to_string())
    }
}

/// Format an error message as the Markdown JSON block the host renders.
///
/// The trailing comma after the `"error"` member is part of the format the
/// host already displays, so the block is intentionally not strict JSON. The
/// message is inserted without escaping.
pub fn json_error_block(message: &str) -> String {
    format!("```json\n{{\n  \"error\": \"{message}\",\n}}\n```\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_json_error_block_layout() {
        assert_eq!(
            json_error_block("bad key"),
            "```json\n{\n  \"error\": \"bad key\",\n}\n```\n"
        );
    }

    #[test]
    fn test_api_error_message_is_remote_text() {
        let err = Error::api(401, "Incorrect API key provided");
        assert_eq!(err.message(), "Incorrect API key provided");
        assert_eq!(
            err.to_string(),
            "Request failed with status 401: Incorrect API key provided"
        );
    }

    #[test]
    fn test_other_errors_use_display_text() {
        let err = Error::stream("unexpected EOF");
        assert_eq!(err.message(), "Stream error: unexpected EOF");
        assert_eq!(
            err.to_block(),
            "```json\n{\n  \"error\": \"Stream error: unexpected EOF\",\n}\n```\n"
        );
    }
}
