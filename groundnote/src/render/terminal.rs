//! Plain-text rendering for terminals, with optional OSC 8 hyperlinks.

use shared_types::{AnnotatedResponse, QueryOutcome, RenderUnit, QUERY_FAILURE_MESSAGE};

use super::{footnote_label, is_web_uri, source_title};

#[derive(Debug, Clone, Copy, Default)]
pub struct TerminalOptions {
    /// Wrap footnote markers and source titles in OSC 8 hyperlinks
    pub hyperlinks: bool,
}

pub fn render_terminal(outcome: &QueryOutcome, options: TerminalOptions) -> String {
    match outcome {
        QueryOutcome::Completed(response) => render_response(response, options),
        QueryOutcome::Failed(_) => format!("{QUERY_FAILURE_MESSAGE}\n"),
    }
}

fn render_response(response: &AnnotatedResponse, options: TerminalOptions) -> String {
    let mut out = String::with_capacity(response.text.len() + 64);
    for unit in &response.plan.units {
        match unit {
            RenderUnit::TextSegment { text } => out.push_str(text),
            RenderUnit::LineBreak => out.push('\n'),
            RenderUnit::FootnoteGroup { ordinals } => {
                for ordinal in ordinals {
                    let marker = format!("[{}]", footnote_label(*ordinal));
                    match response.sources.get(*ordinal) {
                        Some(source) if options.hyperlinks && is_web_uri(&source.uri) => {
                            out.push_str(&hyperlink(&source.uri, &marker))
                        }
                        _ => out.push_str(&marker),
                    }
                }
            }
        }
    }
    if !out.ends_with('\n') {
        out.push('\n');
    }

    if response.sources.is_empty() {
        return out;
    }

    out.push_str("\nSources:\n");
    for (ordinal, source) in response.sources.iter().enumerate() {
        let title = strip_controls(source_title(source));
        let title = if options.hyperlinks && is_web_uri(&source.uri) {
            hyperlink(&source.uri, &title)
        } else {
            title
        };
        out.push_str(&format!(
            "  [{}] {} - {}\n",
            footnote_label(ordinal),
            title,
            strip_controls(&source.uri)
        ));
    }
    out
}

fn hyperlink(uri: &str, text: &str) -> String {
    let uri = strip_controls(uri);
    format!("\x1b]8;;{uri}\x1b\\{text}\x1b]8;;\x1b\\")
}

/// Upstream titles and uris must not carry terminal escape sequences.
fn strip_controls(input: &str) -> String {
    input.chars().filter(|c| !c.is_control()).collect()
}
