//! Read-only reports over collections
//!
//! Answer questions such as "which entries of this paper's bibliography are
//! missing from the main collection" or "what key does the main collection
//! use for the paper cited as `smith2020` elsewhere".

use std::collections::{HashMap, HashSet};

use serde::Serialize;

use crate::index::{EquivalenceIndex, KeyStrategy};
use crate::normalize::{normalize_title, title_key};
use crate::record::Record;

/// An entry present in one collection but not in another
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MissingEntry {
    pub key: Option<String>,
    pub title: String,
}

/// Where a citation key leads in the main collection
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "value", rename_all = "snake_case")]
pub enum RemapOutcome {
    /// Key used by the main collection for the same title
    Resolved(String),
    /// A source defines the key, but its title is not in the main collection
    TitleNotInMain(String),
    /// No source defines the key
    NoSource,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct KeyRemap {
    pub key: String,
    pub outcome: RemapOutcome,
}

/// Records of `other` whose title key is absent from `main`
///
/// Untitled records are never reported.
pub fn missing_from<R: Record>(main: &[R], other: &[R]) -> Vec<MissingEntry> {
    let present: HashSet<String> = main.iter().filter_map(title_key).collect();

    other
        .iter()
        .filter_map(|record| {
            let key = title_key(record)?;
            (!present.contains(&key)).then(|| MissingEntry {
                key: record.identifier().map(str::to_string),
                title: record.title().unwrap_or_default().to_string(),
            })
        })
        .collect()
}

/// First record whose title key equals the key of `title`
pub fn find_by_title<'a, R: Record>(collection: &'a [R], title: &str) -> Option<&'a R> {
    let wanted = normalize_title(title);
    if wanted.is_empty() {
        return None;
    }
    collection
        .iter()
        .find(|record| title_key(*record).as_deref() == Some(wanted.as_str()))
}

/// Record with exactly this identifier
pub fn find_key<'a, R: Record>(collection: &'a [R], key: &str) -> Option<&'a R> {
    collection
        .iter()
        .find(|record| record.identifier() == Some(key))
}

/// Map citation keys used in `sources` to the keys `main` uses for the same titles
///
/// The first source defining a key supplies its title.
pub fn remap_keys<R: Record>(main: &[R], sources: &[&[R]], keys: &[String]) -> Vec<KeyRemap> {
    let index = EquivalenceIndex::build(KeyStrategy::Title, main);

    let mut titles: HashMap<&str, &str> = HashMap::new();
    for source in sources {
        for record in source.iter() {
            if let (Some(id), Some(title)) = (record.identifier(), record.title()) {
                titles.entry(id).or_insert(title);
            }
        }
    }

    keys.iter()
        .map(|key| {
            let outcome = match titles.get(key.as_str()) {
                None => RemapOutcome::NoSource,
                Some(title) => normalized_lookup(&index, main, title)
                    .map(RemapOutcome::Resolved)
                    .unwrap_or_else(|| RemapOutcome::TitleNotInMain(title.to_string())),
            };
            KeyRemap {
                key: key.clone(),
                outcome,
            }
        })
        .collect()
}

fn normalized_lookup<R: Record>(index: &EquivalenceIndex, main: &[R], title: &str) -> Option<String> {
    let key = normalize_title(title);
    if key.is_empty() {
        return None;
    }
    let position = index.lookup(&key)?;
    main[position].identifier().map(str::to_string)
}
