//! Streaming annotated text assembler.
//!
//! Runtime shape:
//! 1) Each upstream chunk feeds the text accumulator and, when it carries
//!    citation data, the source registry and grounding accumulator
//! 2) When the stream ends, the planner turns the final text and groundings
//!    into a render plan
//! 3) A stream failure drops the assembler; no partial plan is ever built

mod grounding;
mod lines;
mod planner;
mod registry;
mod text;

pub use grounding::GroundingAccumulator;
pub use lines::split_lines;
pub use planner::plan;
pub use registry::SourceRegistry;
pub use text::TextAccumulator;

use futures_util::{Stream, StreamExt};
use shared_types::{Grounding, RenderPlan, SourceRecord, StreamChunk};

/// Mutable state of one in-flight request.
#[derive(Debug, Default)]
pub struct ResponseAssembler {
    registry: SourceRegistry,
    groundings: GroundingAccumulator,
    text: TextAccumulator,
    chunks: usize,
}

/// Final state of a fully consumed stream.
#[derive(Debug, Clone, PartialEq)]
pub struct AssembledResponse {
    pub text: String,
    pub sources: Vec<SourceRecord>,
    pub groundings: Vec<Grounding>,
    pub plan: RenderPlan,
    pub chunks: usize,
}

#[derive(Debug, thiserror::Error)]
#[error("stream failed after {chunks} chunks: {source}")]
pub struct AssembleError<E: std::error::Error + 'static> {
    pub chunks: usize,
    #[source]
    pub source: E,
}

impl ResponseAssembler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn ingest(&mut self, chunk: &StreamChunk) {
        self.chunks += 1;
        if let Some(fragment) = chunk.text.as_deref() {
            self.text.push(fragment);
        }
        if chunk.has_citations() {
            // sources first: supports in the same chunk may point at them
            self.groundings
                .record_sources(&mut self.registry, &chunk.sources);
            self.groundings.record_supports(&chunk.supports);
        }
    }

    pub fn text(&self) -> &str {
        self.text.as_str()
    }

    pub fn text_len(&self) -> usize {
        self.text.len()
    }

    pub fn registry(&self) -> &SourceRegistry {
        &self.registry
    }

    pub fn groundings(&self) -> &[Grounding] {
        self.groundings.groundings()
    }

    pub fn chunks(&self) -> usize {
        self.chunks
    }

    pub fn finish(self) -> AssembledResponse {
        let text = self.text.into_string();
        let groundings = self.groundings.into_groundings();
        let plan = plan(&text, &groundings, self.registry.len());
        tracing::debug!(
            chunks = self.chunks,
            text_len = text.len(),
            sources = self.registry.len(),
            groundings = groundings.len(),
            units = plan.len(),
            "Assembled response"
        );
        AssembledResponse {
            text,
            sources: self.registry.into_records(),
            groundings,
            plan,
            chunks: self.chunks,
        }
    }
}

/// Consume `stream` one chunk at a time and assemble the final response.
///
/// `on_text` sees every text fragment as it arrives. The first stream error
/// aborts the whole request.
pub async fn assemble_stream<S, E, F>(
    mut stream: S,
    mut on_text: F,
) -> Result<AssembledResponse, AssembleError<E>>
where
    S: Stream<Item = Result<StreamChunk, E>> + Unpin,
    E: std::error::Error + 'static,
    F: FnMut(&str),
{
    let mut assembler = ResponseAssembler::new();
    while let Some(item) = stream.next().await {
        match item {
            Ok(chunk) => {
                if let Some(fragment) = chunk.text.as_deref().filter(|t| !t.is_empty()) {
                    on_text(fragment);
                }
                assembler.ingest(&chunk);
            }
            Err(source) => {
                return Err(AssembleError {
                    chunks: assembler.chunks(),
                    source,
                });
            }
        }
    }
    Ok(assembler.finish())
}
