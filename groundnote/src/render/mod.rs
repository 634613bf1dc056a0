//! Presentation of assembled responses.
//!
//! Footnote labels are 1-based (`ordinal + 1`). Anchors embed the request id
//! so footnotes of different requests never collide on one page.

pub mod html;
pub mod terminal;

use shared_types::{RequestId, SourceRecord, UNTITLED_SOURCE};

pub use html::{render_html, render_outcome_html};
pub use terminal::{render_terminal, TerminalOptions};

pub fn footnote_label(ordinal: usize) -> usize {
    ordinal + 1
}

pub fn footnote_anchor(request_id: RequestId, ordinal: usize) -> String {
    format!("footnote-{}-{}", request_id, footnote_label(ordinal))
}

pub fn source_title(source: &SourceRecord) -> &str {
    source
        .title
        .as_deref()
        .map(str::trim)
        .filter(|title| !title.is_empty())
        .unwrap_or(UNTITLED_SOURCE)
}

/// Only `http` and `https` sources are rendered as links.
pub fn is_web_uri(uri: &str) -> bool {
    match uri.split_once(':') {
        Some((scheme, rest)) => {
            (scheme.eq_ignore_ascii_case("http") || scheme.eq_ignore_ascii_case("https"))
                && rest.starts_with("//")
        }
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_anchors_are_scoped_by_request() {
        assert_eq!(footnote_anchor(RequestId(1), 0), "footnote-1-1");
        assert_ne!(footnote_anchor(RequestId(1), 0), footnote_anchor(RequestId(2), 0));
    }

    #[test]
    fn test_untitled_fallback() {
        let source = SourceRecord {
            uri: "https://a.example".to_string(),
            title: Some("  ".to_string()),
        };
        assert_eq!(source_title(&source), "Untitled");
    }

    #[test]
    fn test_only_http_schemes_are_links() {
        assert!(is_web_uri("https://a.example"));
        assert!(is_web_uri("HTTP://a.example/path"));
        assert!(!is_web_uri("javascript:alert(1)"));
        assert!(!is_web_uri("data:text/html,<b>x</b>"));
        assert!(!is_web_uri("https:evil"));
        assert!(!is_web_uri("a.example"));
    }
}
