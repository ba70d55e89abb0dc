//! # LKEAP Pipe
//!
//! A chat pipe that exposes TencentCloud's LKEAP inference service (an
//! OpenAI-compatible API serving DeepSeek models) to a host chat application.
//!
//! The pipe does two things:
//!
//! - **Model listing**: fetches the remote catalog and names each model with a
//!   configurable prefix.
//! - **Streaming relay**: forwards one chat request with streaming enabled and
//!   re-emits the answer as text fragments, wrapping the model's reasoning in
//!   `<think>` ... `</think>` markers.
//!
//! Failures never cross the [`ChatPipe`] boundary: listing problems become a
//! single placeholder model and streaming problems a single Markdown error
//! block.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use futures::StreamExt;
//! use lkeap_pipe::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let pipe = LkeapPipe::new(PipeConfig::new("sk-..."))?;
//!
//!     for model in pipe.list_models().await {
//!         println!("{} ({})", model.name, model.id);
//!     }
//!
//!     let request = ChatRequest::new("deepseek-r1", vec![ChatMessage::user("你好")]);
//!     let mut fragments = pipe.stream_chat(request);
//!     while let Some(fragment) = fragments.next().await {
//!         print!("{fragment}");
//!     }
//!
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod client;
pub mod config;
pub mod error;
pub mod pipe;
pub mod stream;
pub mod tracing_ext;
pub mod types;

// Re-exports for convenience
pub use client::LkeapClient;
pub use config::PipeConfig;
pub use error::{json_error_block, Error, Result};
pub use pipe::{ChatPipe, FragmentStream, LkeapPipe};
pub use stream::{Fragment, StreamState, ThinkTagger};
pub use types::{normalize_model_id, ChatMessage, ChatRequest, ModelDescriptor, ModelListing};

/// Prelude module for common imports
pub mod prelude {
    pub use crate::config::PipeConfig;
    pub use crate::error::{Error, Result};
    pub use crate::pipe::{ChatPipe, LkeapPipe};
    pub use crate::types::{ChatMessage, ChatRequest, ModelDescriptor};
}
