//! Source registry - deduplicates citation sources by `uri`.

use std::collections::HashMap;

use shared_types::SourceRecord;

/// Append-only registry of sources for one request.
///
/// The Nth distinct `uri` resolves to ordinal N; a repeated `uri` always
/// resolves to its first ordinal and keeps its first-seen title.
#[derive(Debug, Default, Clone)]
pub struct SourceRegistry {
    ordinals: HashMap<String, usize>,
    records: Vec<SourceRecord>,
}

impl SourceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn resolve(&mut self, uri: &str, title: Option<&str>) -> usize {
        if let Some(ordinal) = self.ordinals.get(uri) {
            return *ordinal;
        }

        let ordinal = self.records.len();
        self.records.push(SourceRecord {
            uri: uri.to_string(),
            title: title.map(ToString::to_string),
        });
        self.ordinals.insert(uri.to_string(), ordinal);
        ordinal
    }

    pub fn get(&self, ordinal: usize) -> Option<&SourceRecord> {
        self.records.get(ordinal)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn into_records(self) -> Vec<SourceRecord> {
        self.records
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_assigns_ordinals_in_insertion_order() {
        let mut registry = SourceRegistry::new();
        assert_eq!(registry.resolve("https://a.example", Some("A")), 0);
        assert_eq!(registry.resolve("https://b.example", None), 1);
        assert_eq!(registry.resolve("https://c.example", Some("C")), 2);
        assert_eq!(registry.len(), 3);
    }

    #[test]
    fn test_repeated_uri_keeps_first_title() {
        let mut registry = SourceRegistry::new();
        assert_eq!(registry.resolve("https://a.example", None), 0);
        assert_eq!(registry.resolve("https://a.example", Some("Later title")), 0);
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.get(0).and_then(|r| r.title.as_deref()), None);
    }

    #[test]
    fn test_empty_registry() {
        let registry = SourceRegistry::new();
        assert!(registry.is_empty());
        assert!(registry.get(0).is_none());
    }
}
