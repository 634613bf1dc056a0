//! Groundnote - streaming assembler for search-grounded model answers
//!
//! Text fragments and grounding metadata arrive incrementally from the
//! upstream model. The assembler accumulates them, deduplicates sources by
//! URI, and produces a render plan that interleaves answer text with
//! footnote groups. The plan is rendered as HTML (HTTP API) or terminal text
//! (CLI).

pub mod actors;
pub mod api;
pub mod assembler;
pub mod config;
pub mod render;
pub mod runtime_env;
pub mod session;
pub mod upstream;
