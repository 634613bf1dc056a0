//! Line splitting for render plans.

use shared_types::RenderUnit;

/// Split `text` on `\n` into text segments joined by line breaks.
///
/// Every `\n` becomes exactly one `LineBreak`; empty lines produce no segment.
pub fn split_lines(text: &str) -> Vec<RenderUnit> {
    let mut units = Vec::new();
    push_lines(&mut units, text);
    units
}

pub(crate) fn push_lines(units: &mut Vec<RenderUnit>, text: &str) {
    for (idx, line) in text.split('\n').enumerate() {
        if idx > 0 {
            units.push(RenderUnit::LineBreak);
        }
        if !line.is_empty() {
            units.push(RenderUnit::text(line));
        }
    }
}
