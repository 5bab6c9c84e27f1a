//! BibTeX reading and writing
//!
//! The format collaborator of bibsync: [`parse`] turns BibTeX text into a
//! [`Bibliography`] of ordered [`BibEntry`] values and [`write`] /
//! [`write_bibliography`] turn them back into text.

mod entry;
pub mod parser;
mod writer;

pub use entry::{BibEntry, EntryType, Field};
pub use parser::{parse, parse_entry, Bibliography, ParseDiagnostic, ParseError};
pub use writer::{write, write_bibliography, write_entry, EntryOrder, WriteOptions};
