//! Shared types between the assembler backend and presentation frontends
//!
//! These types are used by both:
//! - the streaming assembler and HTTP API (native Rust)
//! - any presentation layer consuming a render plan (HTML, terminal, TS clients)
//!
//! Serializable with serde for JSON over HTTP

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

// ============================================================================
// Core Types
// ============================================================================

/// Session-scoped identifier for one query. Strictly increasing within a session.
#[derive(
    Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash, TS,
)]
#[ts(export, export_to = "generated.ts")]
pub struct RequestId(pub u64);

impl RequestId {
    pub fn get(&self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for RequestId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A deduplicated citation source. Identity is the `uri`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, TS)]
#[ts(export, export_to = "generated.ts")]
pub struct SourceRecord {
    pub uri: String,
    pub title: Option<String>,
}

/// Assertion that `[start_index, end_index)` of the final text is supported by
/// the listed registry ordinals.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, TS)]
#[ts(export, export_to = "generated.ts")]
pub struct Grounding {
    pub start_index: usize,
    pub end_index: usize,
    /// Registry ordinals in arrival order; may contain duplicates
    pub source_ordinals: Vec<usize>,
}

// ============================================================================
// Render Plan
// ============================================================================

/// One instruction of a render plan
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, TS)]
#[ts(export, export_to = "generated.ts")]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RenderUnit {
    /// Verbatim text, never containing a line separator
    TextSegment { text: String },
    /// Stands for exactly one `\n` of the source text
    LineBreak,
    /// Footnote markers, ordinals ascending and unique
    FootnoteGroup { ordinals: Vec<usize> },
}

impl RenderUnit {
    pub fn text(text: impl Into<String>) -> Self {
        Self::TextSegment { text: text.into() }
    }

    pub fn footnotes(ordinals: Vec<usize>) -> Self {
        Self::FootnoteGroup { ordinals }
    }
}

/// Ordered sequence of render units for one response
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq, TS)]
#[ts(export, export_to = "generated.ts")]
pub struct RenderPlan {
    pub units: Vec<RenderUnit>,
}

impl RenderPlan {
    pub fn new(units: Vec<RenderUnit>) -> Self {
        Self { units }
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    pub fn len(&self) -> usize {
        self.units.len()
    }

    /// Text covered by the plan, with each line break restored as `\n`.
    pub fn covered_text(&self) -> String {
        let mut out = String::new();
        for unit in &self.units {
            match unit {
                RenderUnit::TextSegment { text } => out.push_str(text),
                RenderUnit::LineBreak => out.push('\n'),
                RenderUnit::FootnoteGroup { .. } => {}
            }
        }
        out
    }

    pub fn footnote_groups(&self) -> impl Iterator<Item = &[usize]> {
        self.units.iter().filter_map(|unit| match unit {
            RenderUnit::FootnoteGroup { ordinals } => Some(ordinals.as_slice()),
            _ => None,
        })
    }
}

// ============================================================================
// Upstream Chunk Protocol
// ============================================================================

/// Citation source entry as delivered by the upstream stream
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq, TS)]
#[ts(export, export_to = "generated.ts")]
pub struct RawSource {
    #[serde(default)]
    pub uri: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
}

/// Grounding-support entry as delivered by the upstream stream.
///
/// Indices are kept signed and optional so malformed entries can be dropped
/// one by one instead of failing the whole chunk.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq, TS)]
#[ts(export, export_to = "generated.ts")]
pub struct RawSupport {
    #[serde(default)]
    pub source_indices: Option<Vec<i64>>,
    #[serde(default)]
    pub start_index: Option<i64>,
    #[serde(default)]
    pub end_index: Option<i64>,
}

/// One normalized unit of the upstream response stream.
/// Absent fields mean "no data this chunk".
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq, TS)]
#[ts(export, export_to = "generated.ts")]
pub struct StreamChunk {
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub sources: Vec<RawSource>,
    #[serde(default)]
    pub supports: Vec<RawSupport>,
}

impl StreamChunk {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            ..Default::default()
        }
    }

    pub fn has_citations(&self) -> bool {
        !self.sources.is_empty() || !self.supports.is_empty()
    }
}

// ============================================================================
// Query Outcomes
// ============================================================================

/// Immutable snapshot of one finished request
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, TS)]
#[ts(export, export_to = "generated.ts")]
pub struct AnnotatedResponse {
    pub request_id: RequestId,
    pub prompt: String,
    /// Accumulated raw text
    pub text: String,
    pub plan: RenderPlan,
    /// Deduplicated sources, indexed by ordinal
    pub sources: Vec<SourceRecord>,
    pub completed_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, TS)]
#[ts(export, export_to = "generated.ts")]
pub struct QueryFailure {
    pub request_id: RequestId,
    pub prompt: String,
    /// Fixed user-facing message; never a partial rendering
    pub message: String,
    pub failed_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, TS)]
#[ts(export, export_to = "generated.ts")]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum QueryOutcome {
    Completed(AnnotatedResponse),
    Failed(QueryFailure),
}

impl QueryOutcome {
    pub fn request_id(&self) -> RequestId {
        match self {
            Self::Completed(response) => response.request_id,
            Self::Failed(failure) => failure.request_id,
        }
    }

    pub fn prompt(&self) -> &str {
        match self {
            Self::Completed(response) => &response.prompt,
            Self::Failed(failure) => &failure.prompt,
        }
    }

    pub fn is_completed(&self) -> bool {
        matches!(self, Self::Completed(_))
    }
}

/// Progress notification emitted while a query streams
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, TS)]
#[ts(export, export_to = "generated.ts")]
#[serde(tag = "phase", rename_all = "snake_case")]
pub enum QueryProgress {
    Started { request_id: RequestId, prompt: String },
    TextDelta { request_id: RequestId, text: String },
    Completed { request_id: RequestId, sources: usize, groundings: usize },
    Failed { request_id: RequestId, message: String },
}

/// Fixed message shown in place of a response when the stream fails
pub const QUERY_FAILURE_MESSAGE: &str = "Sorry, an error occurred while processing your request.";

/// Title shown for sources the upstream did not name
pub const UNTITLED_SOURCE: &str = "Untitled";

// ============================================================================
// Tests
// ============================================================================
