//! Rendering planner - interleaves response text with footnote groups.
//!
//! Citations are anchored at the end of the span they support. Groundings are
//! visited in ascending `end_index` order behind a cursor that only moves
//! forward, so every byte of text is emitted once and each footnote group
//! lands directly after the text it qualifies. Groundings sharing an end
//! offset produce back-to-back groups in arrival order. A span ending on a
//! newline gets its group after that line break, never before the span's end.

use shared_types::{Grounding, RenderPlan, RenderUnit};

use super::lines::push_lines;

pub fn plan(text: &str, groundings: &[Grounding], source_count: usize) -> RenderPlan {
    let mut ordered: Vec<&Grounding> = groundings.iter().collect();
    // sort_by_key is stable: equal end offsets keep arrival order
    ordered.sort_by_key(|grounding| grounding.end_index);

    let mut units = Vec::new();
    let mut cursor = 0;
    for grounding in ordered {
        let end = char_boundary_at_or_after(text, grounding.end_index);
        if cursor < end {
            push_lines(&mut units, &text[cursor..end]);
            cursor = end;
        }

        let ordinals = footnote_ordinals(&grounding.source_ordinals, source_count);
        if !ordinals.is_empty() {
            units.push(RenderUnit::footnotes(ordinals));
        }
    }

    if cursor < text.len() {
        push_lines(&mut units, &text[cursor..]);
    }

    RenderPlan::new(units)
}

/// Deduplicated, ascending ordinals that exist in the registry.
fn footnote_ordinals(ordinals: &[usize], source_count: usize) -> Vec<usize> {
    let mut ordinals = ordinals
        .iter()
        .copied()
        .filter(|ordinal| *ordinal < source_count)
        .collect::<Vec<_>>();
    ordinals.sort_unstable();
    ordinals.dedup();
    ordinals
}

/// Clamp `offset` into `text` and move it forward to the next char boundary.
fn char_boundary_at_or_after(text: &str, offset: usize) -> usize {
    let mut offset = offset.min(text.len());
    while !text.is_char_boundary(offset) {
        offset += 1;
    }
    offset
}
