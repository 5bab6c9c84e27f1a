//! The view of a bibliography entry the engine works with

use bibsync_bibtex::BibEntry;

/// Read access to one bibliographic record
///
/// The matching engine only ever reads records; it replaces or drops whole
/// records and never edits fields. Missing fields are `None`, never errors.
pub trait Record {
    /// Field value by name (case-insensitive)
    fn field(&self, name: &str) -> Option<&str>;

    /// Citation key or other collection-local identifier
    fn identifier(&self) -> Option<&str>;

    /// Number of distinct fields present
    fn field_count(&self) -> usize;

    fn title(&self) -> Option<&str> {
        self.field("title")
    }
}

impl Record for BibEntry {
    fn field(&self, name: &str) -> Option<&str> {
        self.get(name)
    }

    fn identifier(&self) -> Option<&str> {
        Some(self.key.as_str()).filter(|key| !key.is_empty())
    }

    fn field_count(&self) -> usize {
        BibEntry::field_count(self)
    }
}
