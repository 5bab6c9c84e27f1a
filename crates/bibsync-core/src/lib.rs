//! Duplicate detection and merge resolution for bibliography collections
//!
//! The engine decides whether two records denote the same work (equal
//! [title keys](normalize::normalize_title)), which of two such records to
//! keep (published beats preprint, ties favour the record already present),
//! and folds a batch of records into a collection:
//!
//! - [`merge::merge_into`] merges one collection into another
//! - [`dedupe::dedupe_by_title`] and [`dedupe::dedupe_by_identifier`] restore
//!   uniqueness inside one collection
//!
//! The engine is generic over [`Record`] and never fails. The [`library`] and
//! [`audit`] modules build file-level workflows and reports on top of it.

pub mod audit;
pub mod config;
pub mod dedupe;
mod error;
pub mod index;
pub mod library;
pub mod merge;
pub mod normalize;
pub mod quality;
mod record;

pub use config::{OutputConfig, SyncConfig};
pub use dedupe::{dedupe, dedupe_by_identifier, dedupe_by_title, DedupePasses, DedupeReport, Deduplicated};
pub use error::{BibSyncError, Result};
pub use index::{EquivalenceIndex, KeyStrategy};
pub use merge::{merge_into, MergeDecision, MergeReport};
pub use normalize::{normalize_title, title_key};
pub use quality::{classify, is_published, PublicationStatus};
pub use record::Record;
