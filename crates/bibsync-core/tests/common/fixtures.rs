//! Test fixture loading utilities

use std::path::{Path, PathBuf};

use bibsync_bibtex::{BibEntry, EntryType};

/// Get the path to a fixture file
pub fn fixture_path(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("test_fixtures")
        .join(name)
}

/// Copy a fixture into `dir`, returning the new path
#[allow(dead_code)]
pub fn copy_fixture(name: &str, dir: &Path) -> PathBuf {
    let target = dir.join(name);
    std::fs::copy(fixture_path(name), &target)
        .unwrap_or_else(|_| panic!("Failed to copy fixture: {}", name));
    target
}

/// An article with a title and an optional journal
#[allow(dead_code)]
pub fn article(key: &str, title: &str, journal: Option<&str>) -> BibEntry {
    let entry = BibEntry::new(key, EntryType::Article).with_field("title", title);
    match journal {
        Some(journal) => entry.with_field("journal", journal),
        None => entry,
    }
}
