//! Folding an incoming collection into an existing one
//!
//! Each incoming record is matched against the target by title key:
//! - no usable title, or no match: appended (`added`)
//! - match, incoming published and resident not: replaces the resident
//!   record at its position (`replaced`)
//! - any other match: dropped (`skipped`); ties always favour the resident
//!
//! The index is updated after every append, so a later record in the same
//! batch can match one added earlier.

use serde::Serialize;

use crate::index::{EquivalenceIndex, KeyStrategy};
use crate::quality::is_published;
use crate::record::Record;

/// What happened to one incoming record, with its position in the target
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "action", content = "position", rename_all = "snake_case")]
pub enum MergeDecision {
    Added(usize),
    Replaced(usize),
    Skipped(usize),
}

/// Counts of one merge plus the per-record decisions in incoming order
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MergeReport {
    pub added: usize,
    pub replaced: usize,
    pub skipped: usize,
    #[serde(skip)]
    pub decisions: Vec<MergeDecision>,
}

impl MergeReport {
    /// Number of incoming records considered
    pub fn total(&self) -> usize {
        self.added + self.replaced + self.skipped
    }

    /// Add another report's counts to this one (decisions are not carried)
    pub fn absorb(&mut self, other: &MergeReport) {
        self.added += other.added;
        self.replaced += other.replaced;
        self.skipped += other.skipped;
    }

    fn record(&mut self, decision: MergeDecision) {
        match decision {
            MergeDecision::Added(_) => self.added += 1,
            MergeDecision::Replaced(_) => self.replaced += 1,
            MergeDecision::Skipped(_) => self.skipped += 1,
        }
        self.decisions.push(decision);
    }
}

/// Merge `incoming` into `target` in place
pub fn merge_into<R: Record + Clone>(target: &mut Vec<R>, incoming: &[R]) -> MergeReport {
    let mut index = EquivalenceIndex::build(KeyStrategy::Title, target);
    let mut report = MergeReport::default();

    for candidate in incoming {
        let decision = match index.key_of(candidate) {
            None => {
                target.push(candidate.clone());
                MergeDecision::Added(target.len() - 1)
            }
            Some(key) => match index.lookup(&key) {
                None => {
                    target.push(candidate.clone());
                    index.insert(key, target.len() - 1);
                    MergeDecision::Added(target.len() - 1)
                }
                Some(position) => {
                    if supersedes(candidate, &target[position]) {
                        target[position] = candidate.clone();
                        MergeDecision::Replaced(position)
                    } else {
                        MergeDecision::Skipped(position)
                    }
                }
            },
        };
        report.record(decision);
    }

    report
}

/// Only a published record displaces an unpublished one
fn supersedes<R: Record>(incoming: &R, resident: &R) -> bool {
    is_published(incoming) && !is_published(resident)
}
