//! Grounding accumulator - collects citation spans and remaps their source
//! indices through the registry.

use shared_types::{Grounding, RawSource, RawSupport};

use super::registry::SourceRegistry;

/// Per-stream grounding state.
///
/// Upstream support entries reference sources by their raw position in the
/// stream (counting every source entry ever delivered), not by registry
/// ordinal. `raw_ordinals` records that mapping in arrival order.
#[derive(Debug, Default, Clone)]
pub struct GroundingAccumulator {
    raw_ordinals: Vec<Option<usize>>,
    groundings: Vec<Grounding>,
    dropped_supports: usize,
}

impl GroundingAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register every source entry of a chunk and extend the raw-index table.
    ///
    /// Entries without a usable `uri` keep their raw slot but resolve to nothing.
    pub fn record_sources(&mut self, registry: &mut SourceRegistry, sources: &[RawSource]) {
        for source in sources {
            let uri = source
                .uri
                .as_deref()
                .map(str::trim)
                .filter(|uri| !uri.is_empty());
            let ordinal = match uri {
                Some(uri) => Some(registry.resolve(uri, source.title.as_deref())),
                None => {
                    tracing::trace!(
                        raw_index = self.raw_ordinals.len(),
                        "Skipping citation source without uri"
                    );
                    None
                }
            };
            self.raw_ordinals.push(ordinal);
        }
    }

    /// Translate and store every well-formed support entry of a chunk.
    pub fn record_supports(&mut self, supports: &[RawSupport]) {
        for support in supports {
            match self.translate(support) {
                Some(grounding) => self.groundings.push(grounding),
                None => {
                    self.dropped_supports += 1;
                    tracing::trace!(?support, "Dropping incomplete grounding support");
                }
            }
        }
    }

    fn translate(&self, support: &RawSupport) -> Option<Grounding> {
        let start_index = usize::try_from(support.start_index?).ok()?;
        let end_index = usize::try_from(support.end_index?).ok()?;
        let raw_indices = support.source_indices.as_ref()?;

        let source_ordinals = raw_indices
            .iter()
            .filter_map(|raw| usize::try_from(*raw).ok())
            .filter_map(|raw| self.raw_ordinals.get(raw).copied().flatten())
            .collect::<Vec<_>>();
        if source_ordinals.is_empty() {
            return None;
        }

        Some(Grounding {
            start_index,
            end_index,
            source_ordinals,
        })
    }

    pub fn groundings(&self) -> &[Grounding] {
        &self.groundings
    }

    pub fn into_groundings(self) -> Vec<Grounding> {
        self.groundings
    }

    /// Number of raw source entries seen so far, including unresolved ones.
    pub fn raw_source_count(&self) -> usize {
        self.raw_ordinals.len()
    }

    pub fn dropped_supports(&self) -> usize {
        self.dropped_supports
    }
}
