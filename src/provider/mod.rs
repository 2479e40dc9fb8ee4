//! Model backends
//!
//! One capability trait for every backend the client can talk to:
//! - `HostedBackend`: OpenAI-compatible chat completions over SSE
//!   (DeepSeek for reasoning, OpenRouter for responses)
//! - `OllamaBackend`: local server speaking newline-delimited JSON
//!
//! Both hand back a lazy stream of `StreamChunk`s. Dropping the stream
//! closes the underlying connection.

mod hosted;
mod ollama;
mod stream;

pub use hosted::HostedBackend;
pub use ollama::{DEFAULT_OLLAMA_URL, OllamaBackend};

use async_trait::async_trait;
use futures::Stream;
use std::pin::Pin;

use crate::session::Message;

/// One decoded fragment of model output
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamChunk {
    /// Regular content
    Text(String),
    /// Provider-segmented reasoning (e.g. DeepSeek `reasoning_content`)
    Reasoning(String),
}

/// Lazy sequence of chunks from one model call
pub type ChunkStream = Pin<Box<dyn Stream<Item = Result<StreamChunk, BackendError>> + Send>>;

/// Transport-level backend failures
#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{backend} API error {status}: {body}")]
    Status {
        backend: &'static str,
        status: u16,
        body: String,
    },

    /// Error reported inside an otherwise successful stream
    #[error("{backend} stream error: {message}")]
    Stream {
        backend: &'static str,
        message: String,
    },
}

/// Unified streaming interface for model backends
#[async_trait]
pub trait Backend: Send + Sync {
    /// Backend name for logging/display
    fn name(&self) -> &'static str;

    /// Stream the reasoning pass for a conversation
    async fn stream_reasoning(&self, history: &[Message]) -> Result<ChunkStream, BackendError>;

    /// Stream a response from `model` for a conversation
    async fn stream_response(
        &self,
        model: &str,
        history: &[Message],
    ) -> Result<ChunkStream, BackendError>;
}

/// Turn a non-2xx response into `BackendError::Status`
pub(crate) async fn check_status(
    backend: &'static str,
    response: reqwest::Response,
) -> Result<reqwest::Response, BackendError> {
    if response.status().is_success() {
        return Ok(response);
    }

    let status = response.status().as_u16();
    let body = response.text().await.unwrap_or_default();
    Err(BackendError::Status {
        backend,
        status,
        body,
    })
}
