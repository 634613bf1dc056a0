//! Upstream generative-search streams.
//!
//! A [`ChunkSource`] opens one response stream per prompt and yields
//! normalized [`StreamChunk`]s. Any error item is terminal for the request.

pub mod gemini;
pub mod replay;
pub mod sse;

use std::pin::Pin;

use async_trait::async_trait;
use futures_util::Stream;
use shared_types::StreamChunk;

pub use gemini::GeminiSearch;
pub use replay::ReplaySource;

pub type ChunkStream = Pin<Box<dyn Stream<Item = Result<StreamChunk, UpstreamError>> + Send>>;

#[async_trait]
pub trait ChunkSource: Send + Sync {
    /// Short label used in logs.
    fn name(&self) -> &str;

    async fn open(&self, prompt: &str) -> Result<ChunkStream, UpstreamError>;
}

#[derive(Debug, thiserror::Error, Clone)]
pub enum UpstreamError {
    #[error("missing API key env var: {0}")]
    MissingApiKey(String),
    #[error("upstream request failed ({0}): {1}")]
    Request(String, String),
    #[error("upstream returned status {status}: {body}")]
    Status { status: u16, body: String },
    #[error("upstream frame parse failed: {0}")]
    Parse(String),
    #[error("upstream reported error {code}: {message}")]
    Api { code: i64, message: String },
    #[error("replay source unavailable: {0}")]
    Replay(String),
}
