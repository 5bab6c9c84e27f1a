//! Equivalence keys and the position index built over a collection
//!
//! One index type serves both equivalence relations the engine knows about;
//! the [`KeyStrategy`] decides which key is extracted from a record. The
//! index never owns records, it maps keys to positions in the collection it
//! was built from.

use std::collections::HashMap;

use crate::normalize::title_key;
use crate::record::Record;

/// Which equivalence key to extract from a record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyStrategy {
    /// Normalized title
    Title,
    /// Exact identifier (citation key)
    Identifier,
}

impl KeyStrategy {
    /// Key of a record under this strategy; `None` means "never matches"
    pub fn key_of<R: Record + ?Sized>(self, record: &R) -> Option<String> {
        match self {
            KeyStrategy::Title => title_key(record),
            KeyStrategy::Identifier => record
                .identifier()
                .filter(|id| !id.is_empty())
                .map(str::to_string),
        }
    }
}

/// Key -> position map over a collection
#[derive(Debug, Clone)]
pub struct EquivalenceIndex {
    strategy: KeyStrategy,
    positions: HashMap<String, usize>,
}

impl EquivalenceIndex {
    pub fn new(strategy: KeyStrategy) -> Self {
        Self {
            strategy,
            positions: HashMap::new(),
        }
    }

    /// Index every keyed record in one pass
    ///
    /// When two records share a key the later position is kept.
    pub fn build<R: Record>(strategy: KeyStrategy, records: &[R]) -> Self {
        let mut index = Self::new(strategy);
        for (position, record) in records.iter().enumerate() {
            if let Some(key) = strategy.key_of(record) {
                index.insert(key, position);
            }
        }
        index
    }

    pub fn strategy(&self) -> KeyStrategy {
        self.strategy
    }

    /// Key of a record under this index's strategy
    pub fn key_of<R: Record + ?Sized>(&self, record: &R) -> Option<String> {
        self.strategy.key_of(record)
    }

    pub fn lookup(&self, key: &str) -> Option<usize> {
        self.positions.get(key).copied()
    }

    pub fn insert(&mut self, key: String, position: usize) {
        self.positions.insert(key, position);
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }
}

/// Positions grouped by key
///
/// Groups come out in order of their first member; members are in collection
/// order. Records without a key belong to no group.
pub fn group_positions<R: Record>(strategy: KeyStrategy, records: &[R]) -> Vec<Vec<usize>> {
    let mut slot_of: HashMap<String, usize> = HashMap::new();
    let mut groups: Vec<Vec<usize>> = Vec::new();

    for (position, record) in records.iter().enumerate() {
        let Some(key) = strategy.key_of(record) else {
            continue;
        };
        match slot_of.get(&key) {
            Some(&slot) => groups[slot].push(position),
            None => {
                slot_of.insert(key, groups.len());
                groups.push(vec![position]);
            }
        }
    }

    groups
}

#[cfg(test)]
mod tests {
    use super::*;
    use bibsync_bibtex::{BibEntry, EntryType};

    fn titled(key: &str, title: &str) -> BibEntry {
        BibEntry::new(key, EntryType::Article).with_field("title", title)
    }

    #[test]
    fn test_build_keeps_last_position() {
        let records = vec![
            titled("a", "Graph Networks"),
            titled("b", "Other"),
            titled("c", "graph {N}etworks"),
        ];
        let index = EquivalenceIndex::build(KeyStrategy::Title, &records);

        assert_eq!(index.len(), 2);
        assert_eq!(index.lookup("graphnetworks"), Some(2));
        assert_eq!(index.lookup("other"), Some(1));
        assert_eq!(index.lookup("missing"), None);
    }

    #[test]
    fn test_untitled_records_are_not_indexed() {
        let records = vec![
            BibEntry::new("a", EntryType::Misc),
            titled("b", "{}"),
        ];
        let index = EquivalenceIndex::build(KeyStrategy::Title, &records);
        assert!(index.is_empty());
    }

    #[test]
    fn test_insert_then_lookup() {
        let mut index = EquivalenceIndex::new(KeyStrategy::Identifier);
        index.insert("smith2020".to_string(), 4);
        assert_eq!(index.lookup("smith2020"), Some(4));
        assert_eq!(index.strategy(), KeyStrategy::Identifier);
    }

    #[test]
    fn test_group_positions_by_identifier() {
        let records = vec![
            titled("x", "One"),
            titled("y", "Two"),
            titled("x", "Three"),
            titled("", "Four"),
            titled("y", "Five"),
        ];
        let groups = group_positions(KeyStrategy::Identifier, &records);
        assert_eq!(groups, vec![vec![0, 2], vec![1, 4]]);
    }
}
