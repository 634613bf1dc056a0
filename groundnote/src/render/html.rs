//! HTML rendering of a response: footnoted body plus numbered source list.

use shared_types::{AnnotatedResponse, QueryOutcome, RenderUnit, QUERY_FAILURE_MESSAGE};

use super::{footnote_anchor, footnote_label, is_web_uri, source_title};

/// Render the response body followed by the sources section.
/// The sources section is omitted when there are no sources.
pub fn render_html(response: &AnnotatedResponse) -> String {
    let mut html = String::with_capacity(response.text.len() * 2);
    html.push_str("<div class=\"response\">");
    for unit in &response.plan.units {
        match unit {
            RenderUnit::TextSegment { text } => {
                html.push_str("<span>");
                html.push_str(&escape_html(text));
                html.push_str("</span>");
            }
            RenderUnit::LineBreak => html.push_str("<br>"),
            RenderUnit::FootnoteGroup { ordinals } => {
                for ordinal in ordinals {
                    html.push_str(&format!(
                        "<a class=\"footnote-link\" href=\"#{}\">[{}]</a>",
                        footnote_anchor(response.request_id, *ordinal),
                        footnote_label(*ordinal)
                    ));
                }
            }
        }
    }
    html.push_str("</div>");

    if response.sources.is_empty() {
        return html;
    }

    html.push_str("<section class=\"sources\"><h2>Sources</h2><ol>");
    for (ordinal, source) in response.sources.iter().enumerate() {
        let title = escape_html(source_title(source));
        let uri = escape_html(&source.uri);
        let label = format!("<span class=\"title\">{title}</span><span class=\"uri\">{uri}</span>");
        let entry = if is_web_uri(&source.uri) {
            format!(
                "<a href=\"{uri}\" target=\"_blank\" rel=\"noopener noreferrer\" title=\"{title}\">{label}</a>"
            )
        } else {
            label
        };
        html.push_str(&format!(
            "<li id=\"{}\">{entry}</li>",
            footnote_anchor(response.request_id, ordinal)
        ));
    }
    html.push_str("</ol></section>");
    html
}

pub fn render_outcome_html(outcome: &QueryOutcome) -> String {
    match outcome {
        QueryOutcome::Completed(response) => render_html(response),
        QueryOutcome::Failed(_) => format!(
            "<div class=\"response error\">{}</div>",
            escape_html(QUERY_FAILURE_MESSAGE)
        ),
    }
}

fn escape_html(input: &str) -> String {
    input
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#x27;")
}
