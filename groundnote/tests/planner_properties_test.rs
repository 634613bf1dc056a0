//! Property-based tests for the rendering planner.
//!
//! Whatever the groundings look like, the plan must reproduce the text
//! exactly and only ever emit well-formed footnote groups.

use groundnote::assembler::{plan, SourceRegistry};
use proptest::prelude::*;
use shared_types::{Grounding, RenderUnit};

// ============================================================================
// Strategies
// ============================================================================

/// Text mixing ASCII, multibyte characters and newlines.
fn response_text() -> impl Strategy<Value = String> {
    prop::collection::vec(
        prop::sample::select(vec!["a", "b", " ", ".", "\n", "é", "中", "👍"]),
        0..80,
    )
    .prop_map(|parts| parts.concat())
}

/// Groundings whose offsets may run past the end of the text.
fn groundings() -> impl Strategy<Value = Vec<Grounding>> {
    prop::collection::vec(
        (
            0usize..200,
            0usize..200,
            prop::collection::vec(0usize..8, 1..5),
        )
            .prop_map(|(start_index, end_index, source_ordinals)| Grounding {
                start_index,
                end_index,
                source_ordinals,
            }),
        0..12,
    )
}

// ============================================================================
// Plan Properties
// ============================================================================

proptest! {
    /// Text segments and line breaks concatenate back to the original text.
    #[test]
    fn plan_covers_text_exactly(
        text in response_text(),
        groundings in groundings(),
        source_count in 0usize..8,
    ) {
        let plan = plan(&text, &groundings, source_count);
        prop_assert_eq!(plan.covered_text(), text);
    }

    /// Footnote groups are non-empty, ascending, unique and in range.
    #[test]
    fn footnote_groups_are_well_formed(
        text in response_text(),
        groundings in groundings(),
        source_count in 0usize..8,
    ) {
        let plan = plan(&text, &groundings, source_count);
        for ordinals in plan.footnote_groups() {
            prop_assert!(!ordinals.is_empty());
            prop_assert!(ordinals.windows(2).all(|pair| pair[0] < pair[1]));
            prop_assert!(ordinals.iter().all(|ordinal| *ordinal < source_count));
        }
        prop_assert!(plan.footnote_groups().count() <= groundings.len());
    }

    /// No empty text segments, and no segment contains a newline.
    #[test]
    fn text_segments_are_single_line(
        text in response_text(),
        groundings in groundings(),
    ) {
        let plan = plan(&text, &groundings, 8);
        for unit in &plan.units {
            if let RenderUnit::TextSegment { text } = unit {
                prop_assert!(!text.is_empty());
                prop_assert!(!text.contains('\n'));
            }
        }
        let breaks = plan
            .units
            .iter()
            .filter(|unit| matches!(unit, RenderUnit::LineBreak))
            .count();
        prop_assert_eq!(breaks, text.matches('\n').count());
    }

    /// Each footnote group follows exactly the text up to its clamped end.
    #[test]
    fn footnotes_follow_their_span(
        text in response_text(),
        groundings in groundings(),
    ) {
        let plan = plan(&text, &groundings, 8);
        let mut expected_offsets = groundings
            .iter()
            .map(|grounding| {
                let mut end = grounding.end_index.min(text.len());
                while !text.is_char_boundary(end) {
                    end += 1;
                }
                end
            })
            .collect::<Vec<_>>();
        expected_offsets.sort_unstable();

        let mut offset = 0;
        let mut observed_offsets = Vec::new();
        for unit in &plan.units {
            match unit {
                RenderUnit::TextSegment { text } => offset += text.len(),
                RenderUnit::LineBreak => offset += 1,
                RenderUnit::FootnoteGroup { .. } => observed_offsets.push(offset),
            }
        }
        prop_assert_eq!(observed_offsets, expected_offsets);
    }

    /// Planning is a pure function of its inputs.
    #[test]
    fn plan_is_deterministic(
        text in response_text(),
        groundings in groundings(),
        source_count in 0usize..8,
    ) {
        prop_assert_eq!(
            plan(&text, &groundings, source_count),
            plan(&text, &groundings, source_count)
        );
    }

    /// Resolving the same uri again returns its first ordinal and never
    /// grows the registry; ordinals are dense in first-seen order.
    #[test]
    fn registry_dedups_by_uri(uris in prop::collection::vec(0u8..6, 0..40)) {
        let mut registry = SourceRegistry::new();
        let mut first_seen: Vec<u8> = Vec::new();
        for id in &uris {
            let uri = format!("https://source-{id}.example");
            let ordinal = registry.resolve(&uri, Some("title"));
            match first_seen.iter().position(|seen| seen == id) {
                Some(expected) => {
                    prop_assert_eq!(ordinal, expected);
                }
                None => {
                    prop_assert_eq!(ordinal, first_seen.len());
                    first_seen.push(*id);
                }
            }
            prop_assert_eq!(registry.resolve(&uri, None), ordinal);
        }
        prop_assert_eq!(registry.len(), first_seen.len());
    }
}
