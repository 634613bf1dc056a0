//! Gemini `streamGenerateContent` client with Google Search grounding.

use std::collections::VecDeque;
use std::pin::Pin;

use async_trait::async_trait;
use bytes::Bytes;
use futures_util::{Stream, StreamExt};
use serde::Deserialize;
use serde_json::Value;
use shared_types::{RawSource, RawSupport, StreamChunk};

use super::sse::SseDecoder;
use super::{ChunkSource, ChunkStream, UpstreamError};
use crate::config::UpstreamConfig;

pub struct GeminiSearch {
    http: reqwest::Client,
    config: UpstreamConfig,
}

impl GeminiSearch {
    pub fn new(config: UpstreamConfig) -> Result<Self, UpstreamError> {
        let http = reqwest::Client::builder()
            .timeout(std::time::Duration::from_millis(config.timeout_ms))
            .build()
            .map_err(|e| UpstreamError::Request("http_client".to_string(), e.to_string()))?;
        Ok(Self { http, config })
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/v1beta/models/{}:streamGenerateContent",
            self.config.base_url.trim_end_matches('/'),
            self.config.model
        )
    }

    fn request_body(&self, prompt: &str) -> Value {
        let mut body = serde_json::json!({
            "contents": [
                { "role": "user", "parts": [{ "text": prompt }] }
            ]
        });
        if self.config.google_search {
            body["tools"] = serde_json::json!([{ "googleSearch": {} }]);
        }
        if let Some(instruction) = self
            .config
            .system_instruction
            .as_deref()
            .filter(|s| !s.trim().is_empty())
        {
            body["systemInstruction"] = serde_json::json!({ "parts": [{ "text": instruction }] });
        }
        body
    }
}

#[async_trait]
impl ChunkSource for GeminiSearch {
    fn name(&self) -> &str {
        "gemini"
    }

    async fn open(&self, prompt: &str) -> Result<ChunkStream, UpstreamError> {
        let api_key = std::env::var(&self.config.api_key_env)
            .map_err(|_| UpstreamError::MissingApiKey(self.config.api_key_env.clone()))?;

        tracing::debug!(model = %self.config.model, "Opening Gemini stream");
        let response = self
            .http
            .post(self.endpoint())
            .query(&[("alt", "sse")])
            .header("x-goog-api-key", api_key)
            .json(&self.request_body(prompt))
            .send()
            .await
            .map_err(|e| UpstreamError::Request("gemini".to_string(), e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(UpstreamError::Status {
                status: status.as_u16(),
                body,
            });
        }

        Ok(frame_stream(Box::pin(response.bytes_stream())))
    }
}

type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes, reqwest::Error>> + Send>>;

struct FrameState {
    bytes: ByteStream,
    decoder: SseDecoder,
    pending: VecDeque<String>,
    done: bool,
}

/// Turn an SSE byte stream into chunks. The first error ends the stream.
fn frame_stream(bytes: ByteStream) -> ChunkStream {
    let state = FrameState {
        bytes,
        decoder: SseDecoder::new(),
        pending: VecDeque::new(),
        done: false,
    };

    Box::pin(futures_util::stream::unfold(state, |mut state| async move {
        loop {
            if let Some(frame) = state.pending.pop_front() {
                let item = parse_frame(&frame);
                if item.is_err() {
                    state.done = true;
                    state.pending.clear();
                }
                return Some((item, state));
            }
            if state.done {
                return None;
            }
            match state.bytes.next().await {
                Some(Ok(bytes)) => {
                    let frames = state.decoder.push(&bytes);
                    state.pending.extend(frames);
                }
                Some(Err(e)) => {
                    state.done = true;
                    return Some((
                        Err(UpstreamError::Request("gemini".to_string(), e.to_string())),
                        state,
                    ));
                }
                None => {
                    state.done = true;
                    let tail = state.decoder.finish();
                    state.pending.extend(tail);
                }
            }
        }
    }))
}

/// Parse one SSE data payload into a normalized chunk.
pub fn parse_frame(frame: &str) -> Result<StreamChunk, UpstreamError> {
    let response: GenerateContentResponse =
        serde_json::from_str(frame).map_err(|e| UpstreamError::Parse(e.to_string()))?;
    response.into_chunk()
}

// ============================================================================
// Wire types
// ============================================================================

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    #[serde(default)]
    error: Option<ApiErrorBody>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    #[serde(default)]
    content: Option<Content>,
    #[serde(default)]
    grounding_metadata: Option<GroundingMetadata>,
}

#[derive(Debug, Default, Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Default, Deserialize)]
struct Part {
    #[serde(default)]
    text: Option<String>,
    #[serde(default)]
    thought: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GroundingMetadata {
    #[serde(default)]
    grounding_chunks: Vec<GroundingChunk>,
    #[serde(default)]
    grounding_supports: Vec<GroundingSupport>,
}

#[derive(Debug, Default, Deserialize)]
struct GroundingChunk {
    #[serde(default)]
    web: Option<WebSource>,
}

#[derive(Debug, Default, Deserialize)]
struct WebSource {
    #[serde(default)]
    uri: Option<String>,
    #[serde(default)]
    title: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GroundingSupport {
    #[serde(default)]
    grounding_chunk_indices: Option<Vec<i64>>,
    #[serde(default)]
    segment: Option<Segment>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Segment {
    #[serde(default)]
    start_index: Option<i64>,
    #[serde(default)]
    end_index: Option<i64>,
}

#[derive(Debug, Default, Deserialize)]
struct ApiErrorBody {
    #[serde(default)]
    code: i64,
    #[serde(default)]
    message: String,
}

impl GenerateContentResponse {
    pub(crate) fn into_chunk(self) -> Result<StreamChunk, UpstreamError> {
        if let Some(error) = self.error {
            return Err(UpstreamError::Api {
                code: error.code,
                message: error.message,
            });
        }

        let Some(candidate) = self.candidates.into_iter().next() else {
            return Ok(StreamChunk::default());
        };

        let text_parts = candidate
            .content
            .map(|content| content.parts)
            .unwrap_or_default()
            .into_iter()
            .filter(|part| !part.thought.unwrap_or(false))
            .filter_map(|part| part.text)
            .collect::<Vec<_>>();
        let text = if text_parts.is_empty() {
            None
        } else {
            Some(text_parts.concat())
        };

        let metadata = candidate.grounding_metadata.unwrap_or_default();
        let sources = metadata
            .grounding_chunks
            .into_iter()
            .map(|chunk| match chunk.web {
                Some(web) => RawSource {
                    uri: web.uri,
                    title: web.title,
                },
                None => RawSource::default(),
            })
            .collect();
        let supports = metadata
            .grounding_supports
            .into_iter()
            .map(|support| {
                let segment = support.segment.unwrap_or_default();
                RawSupport {
                    source_indices: support.grounding_chunk_indices,
                    start_index: segment.start_index,
                    end_index: segment.end_index,
                }
            })
            .collect();

        Ok(StreamChunk {
            text,
            sources,
            supports,
        })
    }
}
