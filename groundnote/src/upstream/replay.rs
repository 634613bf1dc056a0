//! Replays a captured response stream.
//!
//! Capture files hold one Gemini response frame per line, either as the bare
//! JSON payload or as the original `data: {...}` SSE line. Blank lines and
//! lines starting with `#` are skipped.

use std::path::Path;

use async_trait::async_trait;
use shared_types::StreamChunk;

use super::gemini::parse_frame;
use super::{ChunkSource, ChunkStream, UpstreamError};

#[derive(Debug, Clone, Default)]
pub struct ReplaySource {
    items: Vec<Result<StreamChunk, UpstreamError>>,
}

impl ReplaySource {
    pub fn from_chunks(chunks: Vec<StreamChunk>) -> Self {
        Self {
            items: chunks.into_iter().map(Ok).collect(),
        }
    }

    /// Yield `chunks`, then fail with `error`.
    pub fn failing_after(chunks: Vec<StreamChunk>, error: UpstreamError) -> Self {
        let mut items: Vec<_> = chunks.into_iter().map(Ok).collect();
        items.push(Err(error));
        Self { items }
    }

    pub fn from_capture(capture: &str) -> Self {
        let items = capture
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty() && !line.starts_with('#'))
            .map(|line| {
                let payload = line
                    .strip_prefix("data:")
                    .map(str::trim_start)
                    .unwrap_or(line);
                parse_frame(payload)
            })
            .collect();
        Self { items }
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, UpstreamError> {
        let path = path.as_ref();
        let capture = std::fs::read_to_string(path)
            .map_err(|e| UpstreamError::Replay(format!("{}: {}", path.display(), e)))?;
        Ok(Self::from_capture(&capture))
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

#[async_trait]
impl ChunkSource for ReplaySource {
    fn name(&self) -> &str {
        "replay"
    }

    async fn open(&self, _prompt: &str) -> Result<ChunkStream, UpstreamError> {
        Ok(Box::pin(futures_util::stream::iter(self.items.clone())))
    }
}
