//! Publication-quality classification
//!
//! Decides whether a record describes a formally published work. The rules
//! are ordered: an arXiv or preprint marker in `journal` or `publisher` wins
//! over any venue information, so a conference paper that is also mirrored
//! on arXiv with `journal = {arXiv preprint ...}` counts as a preprint.

use serde::Serialize;

use crate::record::Record;

const PREPRINT_MARKERS: [&str; 2] = ["arxiv", "preprint"];

/// Publication status of a record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PublicationStatus {
    /// Has a journal or booktitle and no preprint marker
    Published,
    /// `journal` or `publisher` mentions arXiv or a preprint
    Preprint,
    /// No venue information at all
    Unvenued,
}

/// Classify a record
pub fn classify<R: Record + ?Sized>(record: &R) -> PublicationStatus {
    let journal = lowered(record, "journal");
    let publisher = lowered(record, "publisher");

    let marked = PREPRINT_MARKERS
        .iter()
        .any(|marker| journal.contains(marker) || publisher.contains(marker));
    if marked {
        return PublicationStatus::Preprint;
    }

    if has_value(record, "journal") || has_value(record, "booktitle") {
        PublicationStatus::Published
    } else {
        PublicationStatus::Unvenued
    }
}

/// True when the record is a formally published work
pub fn is_published<R: Record + ?Sized>(record: &R) -> bool {
    classify(record) == PublicationStatus::Published
}

fn lowered<R: Record + ?Sized>(record: &R, name: &str) -> String {
    record.field(name).unwrap_or_default().to_lowercase()
}

fn has_value<R: Record + ?Sized>(record: &R, name: &str) -> bool {
    record.field(name).is_some_and(|value| !value.is_empty())
}
