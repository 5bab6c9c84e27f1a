//! Removing duplicates inside a single collection
//!
//! Two passes, keyed differently:
//! - title pass: in each group of equal title keys the first published
//!   record is kept, or the first record when none is published
//! - identifier pass: in each group of equal identifiers the record with the
//!   highest [`identifier_score`] is kept, the earliest one on a tie
//!
//! Records without a key are never grouped and never removed. Survivors keep
//! their relative order. Running the title pass first can shrink the set of
//! identifier collisions, so [`dedupe`] always runs it first.

use serde::{Deserialize, Serialize};

use crate::index::{group_positions, KeyStrategy};
use crate::quality::is_published;
use crate::record::Record;

const PUBLISHED_BONUS: u32 = 10;

/// A collection with duplicates removed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Deduplicated<R> {
    pub records: Vec<R>,
    pub removed: usize,
}

/// Which passes [`dedupe`] runs
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum DedupePasses {
    #[default]
    None,
    Title,
    Identifier,
    Both,
}

impl DedupePasses {
    fn by_title(self) -> bool {
        matches!(self, DedupePasses::Title | DedupePasses::Both)
    }

    fn by_identifier(self) -> bool {
        matches!(self, DedupePasses::Identifier | DedupePasses::Both)
    }
}

/// Removal counts per pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DedupeReport {
    pub by_title: usize,
    pub by_identifier: usize,
}

impl DedupeReport {
    pub fn removed(&self) -> usize {
        self.by_title + self.by_identifier
    }
}

/// Keep one record per title key
pub fn dedupe_by_title<R: Record>(records: Vec<R>) -> Deduplicated<R> {
    let groups = group_positions(KeyStrategy::Title, &records);
    let keepers = groups
        .iter()
        .map(|group| first_published(&records, group))
        .collect::<Vec<_>>();
    retain_keepers(records, &groups, &keepers)
}

/// Keep one record per identifier
pub fn dedupe_by_identifier<R: Record>(records: Vec<R>) -> Deduplicated<R> {
    let groups = group_positions(KeyStrategy::Identifier, &records);
    let keepers = groups
        .iter()
        .map(|group| highest_scoring(&records, group))
        .collect::<Vec<_>>();
    retain_keepers(records, &groups, &keepers)
}

/// Run the selected passes, title first
pub fn dedupe<R: Record>(records: Vec<R>, passes: DedupePasses) -> (Vec<R>, DedupeReport) {
    let mut report = DedupeReport::default();
    let mut records = records;

    if passes.by_title() {
        let outcome = dedupe_by_title(records);
        report.by_title = outcome.removed;
        records = outcome.records;
    }
    if passes.by_identifier() {
        let outcome = dedupe_by_identifier(records);
        report.by_identifier = outcome.removed;
        records = outcome.records;
    }

    (records, report)
}

/// `10` for a published record plus its number of distinct fields
pub fn identifier_score<R: Record + ?Sized>(record: &R) -> u32 {
    let bonus = if is_published(record) {
        PUBLISHED_BONUS
    } else {
        0
    };
    bonus + record.field_count() as u32
}

/// Linear scan: the keeper moves only from an unpublished to a published record
fn first_published<R: Record>(records: &[R], group: &[usize]) -> usize {
    let mut keeper = group[0];
    let mut keeper_published = is_published(&records[keeper]);
    for &position in &group[1..] {
        if keeper_published {
            break;
        }
        if is_published(&records[position]) {
            keeper = position;
            keeper_published = true;
        }
    }
    keeper
}

/// Highest score wins; strict comparison keeps the earliest on a tie
fn highest_scoring<R: Record>(records: &[R], group: &[usize]) -> usize {
    let mut keeper = group[0];
    let mut best = identifier_score(&records[keeper]);
    for &position in &group[1..] {
        let score = identifier_score(&records[position]);
        if score > best {
            keeper = position;
            best = score;
        }
    }
    keeper
}

fn retain_keepers<R>(records: Vec<R>, groups: &[Vec<usize>], keepers: &[usize]) -> Deduplicated<R> {
    let mut drop = vec![false; records.len()];
    for (group, &keeper) in groups.iter().zip(keepers) {
        for &position in group {
            if position != keeper {
                drop[position] = true;
            }
        }
    }

    let removed = drop.iter().filter(|d| **d).count();
    let records = records
        .into_iter()
        .zip(drop)
        .filter_map(|(record, dropped)| (!dropped).then_some(record))
        .collect();

    Deduplicated { records, removed }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bibsync_bibtex::{BibEntry, EntryType};

    fn paper(key: &str, title: &str, journal: Option<&str>) -> BibEntry {
        let entry = BibEntry::new(key, EntryType::Article).with_field("title", title);
        match journal {
            Some(journal) => entry.with_field("journal", journal),
            None => entry,
        }
    }

    fn keys(records: &[BibEntry]) -> Vec<&str> {
        records.iter().map(|r| r.key.as_str()).collect()
    }

    #[test]
    fn test_title_pass_keeps_first_published() {
        let records = vec![
            paper("a", "Koopman Sensing", Some("arXiv")),
            paper("other", "Unrelated", None),
            paper("b", "koopman {S}ensing", Some("JFM")),
            paper("c", "Koopman sensing", Some("Nature")),
        ];
        let outcome = dedupe_by_title(records);

        assert_eq!(outcome.removed, 2);
        assert_eq!(keys(&outcome.records), vec!["other", "b"]);
    }

    #[test]
    fn test_title_pass_falls_back_to_first() {
        let records = vec![
            paper("a", "T", Some("arXiv")),
            paper("b", "T", None),
        ];
        let outcome = dedupe_by_title(records);
        assert_eq!(keys(&outcome.records), vec!["a"]);
    }

    #[test]
    fn test_title_pass_ignores_untitled() {
        let records = vec![
            BibEntry::new("a", EntryType::Misc),
            BibEntry::new("b", EntryType::Misc),
        ];
        assert_eq!(dedupe_by_title(records).removed, 0);
    }

    #[test]
    fn test_identifier_pass_prefers_score() {
        let rich = paper("dup", "Preprint Version", Some("arXiv"))
            .with_field("author", "A")
            .with_field("year", "2020")
            .with_field("eprint", "2001.0001");
        let published = paper("dup", "Published Version", Some("Nature"));

        assert_eq!(identifier_score(&rich), 5);
        assert_eq!(identifier_score(&published), 12);

        let outcome = dedupe_by_identifier(vec![rich, published]);
        assert_eq!(outcome.removed, 1);
        assert_eq!(outcome.records[0].title(), Some("Published Version"));
    }

    #[test]
    fn test_identifier_pass_tie_keeps_first() {
        let first = paper("dup", "First", Some("Nature"));
        let second = paper("dup", "Second", Some("Science"));
        let outcome = dedupe_by_identifier(vec![first, second]);

        assert_eq!(outcome.records.len(), 1);
        assert_eq!(outcome.records[0].title(), Some("First"));
    }

    #[test]
    fn test_dedupe_runs_selected_passes() {
        let records = vec![
            paper("a", "Same", None),
            paper("b", "Same", None),
            paper("c", "Different", None),
            paper("c", "Also Different", None),
        ];

        let (kept, report) = dedupe(records.clone(), DedupePasses::None);
        assert_eq!(kept.len(), 4);
        assert_eq!(report.removed(), 0);

        let (kept, report) = dedupe(records, DedupePasses::Both);
        assert_eq!(keys(&kept), vec!["a", "c"]);
        assert_eq!(report, DedupeReport { by_title: 1, by_identifier: 1 });
    }
}
