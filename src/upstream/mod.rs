//! Upstream text-generation providers.
//!
//! - [`anthropic`]: Anthropic Messages API over SSE
//! - [`scripted`]: In-process provider replaying a fixed script
//! - [`sse`]: Incremental Server-Sent-Events parser
//!
//! The relay only depends on [`TextStreamProvider`]: an async producer of
//! tagged [`UpstreamEvent`]s, of which only text deltas carry output.

pub mod anthropic;
pub mod scripted;
pub mod sse;

use std::fmt;

use async_trait::async_trait;
use futures::stream::BoxStream;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum UpstreamError {
    #[error("Upstream request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Upstream returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Upstream reported an error: {0}")]
    Api(String),

    #[error("Undecodable upstream event: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("Upstream stream failed: {0}")]
    Stream(String),
}

/// Stream of events from one upstream call.
pub type EventStream = BoxStream<'static, Result<UpstreamEvent, UpstreamError>>;

/// One event from the upstream stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpstreamEvent {
    /// An incremental fragment of generated text.
    TextDelta(String),
    /// Any other event kind (message start/stop, pings, ...), named by its type.
    Other(String),
}

/// Parameters of a single streaming completion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletionRequest {
    pub model: String,
    pub prompt: String,
    pub max_tokens: u32,
}

/// API key for the upstream service. Never printed.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential(String);

impl Credential {
    /// Wrap a key, rejecting blank values.
    pub fn new(key: impl Into<String>) -> Option<Self> {
        let key = key.into();
        if key.trim().is_empty() {
            None
        } else {
            Some(Self(key))
        }
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Credential(***)")
    }
}

/// A streaming chat-completion backend.
#[async_trait]
pub trait TextStreamProvider: Send + Sync {
    fn name(&self) -> &'static str;

    /// Start a completion. Errors here mean nothing was streamed yet.
    async fn open_stream(
        &self,
        credential: &Credential,
        request: CompletionRequest,
    ) -> Result<EventStream, UpstreamError>;
}
