//! Streaming relay for chat completions
//!
//! Decodes the server-sent event body of a streaming chat completion and
//! re-tags it for the host: reasoning text is wrapped in `<think>` and the
//! final answer follows a `</think>` marker.
//!
//! The LKEAP endpoint sometimes answers a streaming request with a plain JSON
//! error object instead of an event stream. The first line of the body is
//! therefore inspected before decoding; when it is not an error, the buffered
//! bytes are replayed so that every line goes through the same decoder.

use crate::error::{Error, Result};
use async_stream::try_stream;
use bytes::{Bytes, BytesMut};
use eventsource_stream::{EventStreamError, Eventsource};
use futures::future;
use futures::stream::{self, Stream, StreamExt};
use serde::Deserialize;
use std::fmt;
use tracing::trace;

/// Opening marker for the reasoning channel
pub const THINK_OPEN: &str = "<think>";

/// Closing marker for the reasoning channel
pub const THINK_CLOSE: &str = "</think>";

/// Channel the relay is currently emitting into
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StreamState {
    /// Nothing tagged yet
    #[default]
    Empty,
    /// Inside the reasoning channel
    Thinking,
    /// Final answer after reasoning
    Content,
}

/// A unit of relay output
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Fragment {
    /// `<think>` marker
    ThinkOpen,
    /// Reasoning text
    Reasoning(String),
    /// `</think>` marker
    ThinkClose,
    /// Final answer text
    Content(String),
}

impl Fragment {
    /// Text the host displays for this fragment
    pub fn as_str(&self) -> &str {
        match self {
            Self::ThinkOpen => THINK_OPEN,
            Self::ThinkClose => THINK_CLOSE,
            Self::Reasoning(text) | Self::Content(text) => text,
        }
    }

    /// Convert into the host-facing string
    pub fn into_string(self) -> String {
        match self {
            Self::ThinkOpen => THINK_OPEN.to_string(),
            Self::ThinkClose => THINK_CLOSE.to_string(),
            Self::Reasoning(text) | Self::Content(text) => text,
        }
    }
}

impl fmt::Display for Fragment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Stream chunk from a streaming chat completion
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StreamChunk {
    /// Choices carried by this chunk
    #[serde(default)]
    pub choices: Option<Vec<StreamChoice>>,
}

impl StreamChunk {
    /// Delta of the first choice, if any
    pub fn first_delta(&self) -> Option<&Delta> {
        self.choices.as_ref()?.first()?.delta.as_ref()
    }
}

/// Choice in a stream chunk
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StreamChoice {
    /// Incremental content
    #[serde(default)]
    pub delta: Option<Delta>,
}

/// Incremental content of a stream chunk
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Delta {
    /// Reasoning text
    #[serde(default)]
    pub reasoning_content: Option<String>,
    /// Final answer text
    #[serde(default)]
    pub content: Option<String>,
}

impl Delta {
    fn reasoning(&self) -> Option<&str> {
        self.reasoning_content.as_deref().filter(|s| !s.is_empty())
    }

    fn content(&self) -> Option<&str> {
        self.content.as_deref().filter(|s| !s.is_empty())
    }
}

/// Tracks the reasoning/answer boundary of one response.
///
/// Once the answer has started the tagger never reopens the reasoning
/// channel, and a response that only reasons is left without `</think>`.
#[derive(Debug, Default)]
pub struct ThinkTagger {
    state: StreamState,
}

impl ThinkTagger {
    /// Create a tagger in the empty state
    pub fn new() -> Self {
        Self::default()
    }

    /// Current state
    pub fn state(&self) -> StreamState {
        self.state
    }

    /// Fragments to emit for one delta
    pub fn push(&mut self, delta: &Delta) -> Vec<Fragment> {
        let mut out = Vec::with_capacity(2);

        if let Some(reasoning) = delta.reasoning() {
            if self.state == StreamState::Empty {
                self.state = StreamState::Thinking;
                out.push(Fragment::ThinkOpen);
            }
            out.push(Fragment::Reasoning(reasoning.to_string()));
        }

        if let Some(content) = delta.content() {
            if self.state == StreamState::Thinking {
                self.state = StreamState::Content;
                out.push(Fragment::ThinkClose);
            }
            out.push(Fragment::Content(content.to_string()));
        }

        out
    }
}

/// Relay a streaming chat completion body as tagged fragments.
///
/// The stream ends on `[DONE]`, on end of body, or after the first error.
pub fn relay_events<S, E>(body: S) -> impl Stream<Item = Result<Fragment>> + Send
where
    S: Stream<Item = std::result::Result<Bytes, E>> + Send + 'static,
    E: std::error::Error + Send + 'static,
    Error: From<E>,
{
    try_stream! {
        let mut body = Box::pin(body);

        let mut head = BytesMut::new();
        while !head.contains(&b'\n') {
            match body.next().await {
                Some(chunk) => head.extend_from_slice(&chunk?),
                None => break,
            }
        }

        if let Some(message) = in_band_error(&first_line(&head)) {
            Err::<(), _>(Error::remote(message))?;
        }

        let replay = stream::once(future::ready(Ok::<Bytes, E>(head.freeze()))).chain(body);
        let mut events = Box::pin(replay.eventsource());
        let mut tagger = ThinkTagger::new();

        while let Some(event) = events.next().await {
            let event = event.map_err(decode_error)?;
            if event.data.is_empty() {
                continue;
            }
            if event.data.starts_with("[DONE]") {
                trace!("received [DONE]");
                break;
            }

            let chunk: StreamChunk = serde_json::from_str(&event.data)?;
            if let Some(delta) = chunk.first_delta() {
                for fragment in tagger.push(delta) {
                    yield fragment;
                }
            }
        }
    }
}

fn first_line(buf: &[u8]) -> String {
    let end = buf.iter().position(|&b| b == b'\n').unwrap_or(buf.len());
    String::from_utf8_lossy(&buf[..end])
        .trim_end_matches('\r')
        .to_string()
}

/// Message of a plain JSON `{"error": {"message": ...}}` line
fn in_band_error(line: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(line.trim()).ok()?;
    let message = value.get("error")?.get("message")?;
    Some(match message {
        serde_json::Value::String(text) => text.clone(),
        other => other.to_string(),
    })
}

fn decode_error<E>(err: EventStreamError<E>) -> Error
where
    E: std::error::Error,
    Error: From<E>,
{
    match err {
        EventStreamError::Transport(e) => e.into(),
        other => Error::stream(other.to_string()),
    }
}
