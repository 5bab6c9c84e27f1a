//! Bibliography entry data structures

use serde::{Serialize, Serializer};

/// BibTeX entry type
///
/// Unrecognised types are kept verbatim in [`EntryType::Other`] so that a
/// file written back out keeps the author's spelling.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum EntryType {
    Article,
    Book,
    Booklet,
    InBook,
    InCollection,
    InProceedings,
    Manual,
    MastersThesis,
    Misc,
    PhdThesis,
    Proceedings,
    TechReport,
    Unpublished,
    Online,
    Software,
    Dataset,
    Other(String),
}

impl EntryType {
    /// Parse an entry type name (case-insensitive)
    pub fn parse(name: &str) -> Self {
        match name.to_ascii_lowercase().as_str() {
            "article" => Self::Article,
            "book" => Self::Book,
            "booklet" => Self::Booklet,
            "inbook" => Self::InBook,
            "incollection" => Self::InCollection,
            "inproceedings" | "conference" => Self::InProceedings,
            "manual" => Self::Manual,
            "mastersthesis" => Self::MastersThesis,
            "misc" => Self::Misc,
            "phdthesis" => Self::PhdThesis,
            "proceedings" => Self::Proceedings,
            "techreport" => Self::TechReport,
            "unpublished" => Self::Unpublished,
            "online" | "electronic" | "www" => Self::Online,
            "software" => Self::Software,
            "dataset" => Self::Dataset,
            other => Self::Other(other.to_string()),
        }
    }

    /// Canonical lowercase name used when writing
    pub fn as_str(&self) -> &str {
        match self {
            Self::Article => "article",
            Self::Book => "book",
            Self::Booklet => "booklet",
            Self::InBook => "inbook",
            Self::InCollection => "incollection",
            Self::InProceedings => "inproceedings",
            Self::Manual => "manual",
            Self::MastersThesis => "mastersthesis",
            Self::Misc => "misc",
            Self::PhdThesis => "phdthesis",
            Self::Proceedings => "proceedings",
            Self::TechReport => "techreport",
            Self::Unpublished => "unpublished",
            Self::Online => "online",
            Self::Software => "software",
            Self::Dataset => "dataset",
            Self::Other(name) => name,
        }
    }
}

impl Serialize for EntryType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// A single `name = value` pair
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Field {
    pub name: String,
    pub value: String,
}

/// One bibliography entry: a citation key, a type and ordered fields
///
/// Field names are stored lowercased, so lookups are case-insensitive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BibEntry {
    pub key: String,
    pub entry_type: EntryType,
    pub fields: Vec<Field>,
}

impl BibEntry {
    pub fn new(key: impl Into<String>, entry_type: EntryType) -> Self {
        Self {
            key: key.into(),
            entry_type,
            fields: Vec::new(),
        }
    }

    /// Builder-style [`BibEntry::set`]
    pub fn with_field(mut self, name: &str, value: impl Into<String>) -> Self {
        self.set(name, value);
        self
    }

    /// Set a field, replacing an existing value in place or appending a new one
    pub fn set(&mut self, name: &str, value: impl Into<String>) {
        let name = name.to_ascii_lowercase();
        let value = value.into();
        match self.fields.iter_mut().find(|f| f.name == name) {
            Some(field) => field.value = value,
            None => self.fields.push(Field { name, value }),
        }
    }

    /// Get a field value by name (case-insensitive)
    pub fn get(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|f| f.name.eq_ignore_ascii_case(name))
            .map(|f| f.value.as_str())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Number of distinct field names on the entry
    pub fn field_count(&self) -> usize {
        let mut names: Vec<&str> = self.fields.iter().map(|f| f.name.as_str()).collect();
        names.sort_unstable();
        names.dedup();
        names.len()
    }

    pub fn title(&self) -> Option<&str> {
        self.get("title")
    }

    pub fn journal(&self) -> Option<&str> {
        self.get("journal")
    }

    pub fn booktitle(&self) -> Option<&str> {
        self.get("booktitle")
    }

    pub fn publisher(&self) -> Option<&str> {
        self.get("publisher")
    }

    pub fn year(&self) -> Option<&str> {
        self.get("year")
    }
}
