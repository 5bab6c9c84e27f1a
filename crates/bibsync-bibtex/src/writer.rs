//! BibTeX writer
//!
//! Turns entries back into BibTeX text. Values are always brace-delimited
//! (purely numeric values are written bare), so LaTeX markup in a value
//! survives a read/write cycle unchanged.

use serde::Deserialize;

use crate::entry::BibEntry;
use crate::parser::Bibliography;

/// Order in which entries are written
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EntryOrder {
    /// Collection order
    #[default]
    Preserve,
    /// Sorted by citation key
    ByKey,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteOptions {
    pub indent: String,
    pub order: EntryOrder,
}

impl Default for WriteOptions {
    fn default() -> Self {
        Self {
            indent: " ".to_string(),
            order: EntryOrder::Preserve,
        }
    }
}

/// Write entries only
pub fn write(entries: &[BibEntry], options: &WriteOptions) -> String {
    let mut ordered: Vec<&BibEntry> = entries.iter().collect();
    if options.order == EntryOrder::ByKey {
        ordered.sort_by(|a, b| a.key.cmp(&b.key));
    }

    let mut out = String::new();
    for entry in ordered {
        write_entry_into(&mut out, entry, &options.indent);
        out.push_str("\n\n");
    }
    out
}

/// Write comments, preambles, `@string` definitions and entries, in that order
pub fn write_bibliography(bib: &Bibliography, options: &WriteOptions) -> String {
    let mut out = String::new();
    for comment in &bib.comments {
        out.push_str(&format!("@comment{{{}}}\n\n", comment));
    }
    for preamble in &bib.preambles {
        out.push_str(&format!("@preamble{{{{{}}}}}\n\n", preamble));
    }
    for (name, value) in &bib.strings {
        out.push_str(&format!("@string{{{} = {{{}}}}}\n\n", name, value));
    }
    out.push_str(&write(&bib.entries, options));
    out
}

/// Write a single entry without a trailing newline
pub fn write_entry(entry: &BibEntry) -> String {
    let mut out = String::new();
    write_entry_into(&mut out, entry, &WriteOptions::default().indent);
    out
}

fn write_entry_into(out: &mut String, entry: &BibEntry, indent: &str) {
    out.push('@');
    out.push_str(entry.entry_type.as_str());
    out.push('{');
    out.push_str(&entry.key);

    for field in &entry.fields {
        out.push_str(",\n");
        out.push_str(indent);
        out.push_str(&field.name);
        out.push_str(" = ");
        out.push_str(&delimit(&field.value));
    }

    out.push_str("\n}");
}

fn delimit(value: &str) -> String {
    if !value.is_empty() && value.chars().all(|c| c.is_ascii_digit()) {
        value.to_string()
    } else {
        format!("{{{}}}", value)
    }
}
