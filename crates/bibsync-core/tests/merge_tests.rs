//! Merge resolver integration tests

mod common;

use bibsync_bibtex::{parse, BibEntry, EntryType, WriteOptions};
use bibsync_core::library::{load, update};
use bibsync_core::{merge_into, MergeDecision};
use common::fixtures::{article, copy_fixture, fixture_path};
use proptest::prelude::*;
use tempfile::TempDir;

// === Fixture Files ===

#[test]
fn test_update_fixture_files() {
    let dir = TempDir::new().unwrap();
    let main = copy_fixture("main.bib", dir.path());
    let out = dir.path().join("main_updated.bib");

    let summary = update(&main, &fixture_path("incoming.bib"), &out, &WriteOptions::default()).unwrap();

    assert_eq!(summary.original_entries, 4);
    assert_eq!(
        (summary.merge.added, summary.merge.replaced, summary.merge.skipped),
        (2, 1, 1)
    );
    assert_eq!(summary.total_entries, 6);

    let written = load(&out).unwrap();
    let keys: Vec<&str> = written.entries.iter().map(|e| e.key.as_str()).collect();
    assert_eq!(
        keys,
        vec![
            "Lusch2018",
            "schmid2010dmd",
            "koopman1931",
            "untitled-note",
            "vaswani2017",
            "another-note"
        ]
    );
    assert_eq!(written.entries[0].journal(), Some("Nature Communications"));
    assert_eq!(
        written.entries[1].journal(),
        Some("Journal of Fluid Mechanics")
    );
    assert_eq!(written.strings.len(), 1);
}

#[test]
fn test_update_leaves_main_file_untouched() {
    let dir = TempDir::new().unwrap();
    let main = copy_fixture("main.bib", dir.path());
    let before = std::fs::read_to_string(&main).unwrap();

    update(
        &main,
        &fixture_path("incoming.bib"),
        &dir.path().join("out.bib"),
        &WriteOptions::default(),
    )
    .unwrap();

    assert_eq!(std::fs::read_to_string(&main).unwrap(), before);
}

// === Documented Properties ===

#[test]
fn test_merging_collection_into_itself_skips_everything() {
    let bib = parse(&std::fs::read_to_string(fixture_path("incoming.bib")).unwrap()).unwrap();
    let titled: Vec<BibEntry> = bib
        .entries
        .into_iter()
        .filter(|e| e.title().is_some())
        .collect();

    let mut target = titled.clone();
    let report = merge_into(&mut target, &titled);

    assert_eq!((report.added, report.replaced, report.skipped), (0, 0, titled.len()));
    assert_eq!(target, titled);
}

#[test]
fn test_published_supersedes_preprint() {
    let mut target = vec![article("x", "X", Some("arXiv"))];
    let report = merge_into(&mut target, &[article("y", "X", Some("Nature"))]);

    assert_eq!((report.added, report.replaced, report.skipped), (0, 1, 0));
    assert_eq!(target[0].journal(), Some("Nature"));
}

#[test]
fn test_preprint_never_supersedes_published() {
    let mut target = vec![article("x", "X", Some("Nature"))];
    let report = merge_into(&mut target, &[article("y", "X", Some("arXiv"))]);

    assert_eq!((report.added, report.replaced, report.skipped), (0, 0, 1));
    assert_eq!(target[0].key, "x");
}

#[test]
fn test_conference_paper_mirrored_on_arxiv_counts_as_preprint() {
    let mirrored = BibEntry::new("conf", EntryType::InProceedings)
        .with_field("title", "X")
        .with_field("booktitle", "ICLR")
        .with_field("publisher", "arXiv");
    let mut target = vec![mirrored];
    let report = merge_into(&mut target, &[article("j", "X", Some("JMLR"))]);

    assert_eq!(report.decisions, vec![MergeDecision::Replaced(0)]);
}

// === Property Tests ===

fn arb_record(titles: &'static [&'static str]) -> impl Strategy<Value = BibEntry> {
    (
        prop::sample::select(titles),
        prop::option::of(prop::sample::select(JOURNALS)),
        "[a-z]{1,6}",
    )
        .prop_map(|(title, journal, key)| {
            let entry = BibEntry::new(key, EntryType::Article);
            let entry = if title.is_empty() {
                entry
            } else {
                entry.with_field("title", title)
            };
            match journal {
                Some(journal) => entry.with_field("journal", journal),
                None => entry,
            }
        })
}

const TITLES: &[&str] = &["", "Alpha", "alpha", "{A}lpha", "Beta", "\\emph{Gamma}", "{}"];
const JOURNALS: &[&str] = &["Nature", "arXiv", "Preprint server", ""];

proptest! {
    #[test]
    fn test_merge_counts_add_up(
        target in prop::collection::vec(arb_record(TITLES), 0..8),
        incoming in prop::collection::vec(arb_record(TITLES), 0..8),
    ) {
        let mut merged = target.clone();
        let report = merge_into(&mut merged, &incoming);

        prop_assert_eq!(merged.len(), target.len() + report.added);
        prop_assert_eq!(report.total(), incoming.len());
        prop_assert_eq!(report.decisions.len(), incoming.len());
    }

    #[test]
    fn test_merge_never_drops_resident_records(
        target in prop::collection::vec(arb_record(TITLES), 0..8),
        incoming in prop::collection::vec(arb_record(TITLES), 0..8),
    ) {
        let mut merged = target.clone();
        merge_into(&mut merged, &incoming);

        // every resident position still holds a record with the same title key
        for (before, after) in target.iter().zip(&merged) {
            prop_assert_eq!(
                bibsync_core::title_key(before),
                bibsync_core::title_key(after)
            );
        }
    }
}
