//! BibTeX reader built on nom
//!
//! Understands `@string` macros (the month abbreviations are predefined),
//! `@preamble`, `@comment`, `%` line comments, braced and quoted values,
//! bare numbers, macro references and `#` concatenation. Entry bodies may be
//! delimited by `{...}` or `(...)`.
//!
//! A malformed entry does not abort the read: it is reported as a
//! [`ParseDiagnostic`] and reading resumes at the next `@`. Only an entry
//! whose braces never close fails the whole parse, since everything after it
//! would be misread.

use std::collections::HashMap;

use lazy_static::lazy_static;
use nom::{
    branch::alt,
    bytes::complete::take_while1,
    character::complete::{char, multispace0},
    combinator::map,
    IResult,
};
use serde::Serialize;

use crate::entry::{BibEntry, EntryType};

lazy_static! {
    /// Macros every BibTeX style knows without an `@string` definition.
    static ref COMMON_STRINGS: HashMap<&'static str, &'static str> = {
        let mut m = HashMap::new();
        m.insert("jan", "January");
        m.insert("feb", "February");
        m.insert("mar", "March");
        m.insert("apr", "April");
        m.insert("may", "May");
        m.insert("jun", "June");
        m.insert("jul", "July");
        m.insert("aug", "August");
        m.insert("sep", "September");
        m.insert("oct", "October");
        m.insert("nov", "November");
        m.insert("dec", "December");
        m
    };
}

/// A recoverable problem found while reading
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ParseDiagnostic {
    pub line: u32,
    pub message: String,
}

/// Everything read from one BibTeX source
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Bibliography {
    pub entries: Vec<BibEntry>,
    /// `@string` definitions in the order they appeared
    pub strings: Vec<(String, String)>,
    pub preambles: Vec<String>,
    /// `@comment` bodies, kept so a rewrite does not lose them
    pub comments: Vec<String>,
    pub diagnostics: Vec<ParseDiagnostic>,
}

impl Bibliography {
    pub fn from_entries(entries: Vec<BibEntry>) -> Self {
        Self {
            entries,
            ..Self::default()
        }
    }

    /// Look up an entry by citation key
    pub fn entry(&self, key: &str) -> Option<&BibEntry> {
        self.entries.iter().find(|e| e.key == key)
    }
}

/// Fatal read errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    #[error("unbalanced braces in entry starting at line {line}")]
    Unbalanced { line: u32 },
}

/// Macro table seen while reading: user definitions shadow the common strings
#[derive(Default)]
struct Macros {
    defined: HashMap<String, String>,
}

impl Macros {
    fn resolve(&self, name: &str) -> String {
        let lower = name.to_ascii_lowercase();
        if let Some(value) = self.defined.get(&lower) {
            return value.clone();
        }
        COMMON_STRINGS
            .get(lower.as_str())
            .map(|v| v.to_string())
            .unwrap_or_else(|| name.to_string())
    }

    fn define(&mut self, name: &str, value: &str) {
        self.defined
            .insert(name.to_ascii_lowercase(), value.to_string());
    }
}

enum Block {
    Entry(BibEntry),
    String(String, String),
    Preamble(String),
    Comment(String),
}

/// Parse BibTeX text
pub fn parse(input: &str) -> Result<Bibliography, ParseError> {
    let mut bib = Bibliography::default();
    let mut macros = Macros::default();
    let mut remaining = input;
    let mut line = 1;

    while let Some(at) = remaining.find('@') {
        line += newlines(&remaining[..at]);
        remaining = &remaining[at..];
        if in_line_comment(input, remaining) {
            remaining = &remaining[1..];
            continue;
        }

        match parse_block(remaining, &macros) {
            Ok((rest, block)) => {
                match block {
                    Block::Entry(entry) => bib.entries.push(entry),
                    Block::String(name, value) => {
                        macros.define(&name, &value);
                        bib.strings.push((name, value));
                    }
                    Block::Preamble(text) => bib.preambles.push(text),
                    Block::Comment(text) => bib.comments.push(text),
                }
                line += newlines(&remaining[..remaining.len() - rest.len()]);
                remaining = rest;
            }
            Err(_) => {
                // a stray `@` in free text (an e-mail address, say) is not an entry
                if looks_like_block(remaining) {
                    if opens_without_closing(remaining) {
                        return Err(ParseError::Unbalanced { line });
                    }
                    bib.diagnostics.push(ParseDiagnostic {
                        line,
                        message: format!("skipped malformed entry: {}", first_line(remaining)),
                    });
                }
                remaining = &remaining[1..];
            }
        }
    }

    Ok(bib)
}

/// Parse a single entry, ignoring anything after it
pub fn parse_entry(input: &str) -> Option<BibEntry> {
    parse(input).ok()?.entries.into_iter().next()
}

fn newlines(consumed: &str) -> u32 {
    consumed.bytes().filter(|b| *b == b'\n').count() as u32
}

/// True when the text before `rest` on its line starts with `%`
fn in_line_comment(input: &str, rest: &str) -> bool {
    let before = &input[..input.len() - rest.len()];
    let line_start = before.rfind('\n').map_or(0, |i| i + 1);
    before[line_start..].trim_start().starts_with('%')
}

fn first_line(s: &str) -> &str {
    let line = s.lines().next().unwrap_or_default();
    match line.char_indices().nth(60) {
        Some((idx, _)) => &line[..idx],
        None => line,
    }
}

/// Text after `@name` when it opens a body with `{` or `(`
fn block_opening(input: &str) -> Option<&str> {
    let rest = input.get(1..)?.trim_start();
    let name_len = rest
        .find(|c: char| !c.is_ascii_alphanumeric())
        .unwrap_or(rest.len());
    if name_len == 0 {
        return None;
    }
    let body = rest[name_len..].trim_start();
    (body.starts_with('{') || body.starts_with('(')).then_some(body)
}

fn looks_like_block(input: &str) -> bool {
    block_opening(input).is_some()
}

/// True when the block at `input` opens a brace that never closes
fn opens_without_closing(input: &str) -> bool {
    block_opening(input).is_some_and(|body| body.starts_with('{') && braced(body).is_err())
}

/// Consume `{` or `(`, returning the matching closer
fn open_body(input: &str) -> IResult<&str, char> {
    alt((
        map(char('{'), |_| '}'),
        map(char('('), |_| ')'),
    ))(input)
}

fn parse_block<'a>(input: &'a str, macros: &Macros) -> IResult<&'a str, Block> {
    let (rest, _) = char('@')(input)?;
    let (rest, _) = multispace0(rest)?;
    let (rest, kind) = take_while1(|c: char| c.is_ascii_alphanumeric())(rest)?;
    let (rest, _) = multispace0(rest)?;

    match kind.to_ascii_lowercase().as_str() {
        "string" => {
            let (rest, close) = open_body(rest)?;
            let (rest, (name, value)) = assignment(rest, macros)?;
            let (rest, _) = multispace0(rest)?;
            let (rest, _) = char(close)(rest)?;
            Ok((rest, Block::String(name, value)))
        }
        "preamble" => {
            let (rest, close) = open_body(rest)?;
            let (rest, _) = multispace0(rest)?;
            let (rest, text) = value(rest, macros)?;
            let (rest, _) = multispace0(rest)?;
            let (rest, _) = char(close)(rest)?;
            Ok((rest, Block::Preamble(text)))
        }
        "comment" => {
            if rest.starts_with('{') {
                let (rest, body) = braced(rest)?;
                Ok((rest, Block::Comment(body[1..body.len() - 1].to_string())))
            } else {
                let end = rest.find('\n').unwrap_or(rest.len());
                Ok((&rest[end..], Block::Comment(rest[..end].trim_end().to_string())))
            }
        }
        _ => {
            let (rest, entry) = entry_body(rest, kind, macros)?;
            Ok((rest, Block::Entry(entry)))
        }
    }
}

fn entry_body<'a>(input: &'a str, kind: &str, macros: &Macros) -> IResult<&'a str, BibEntry> {
    let (rest, close) = open_body(input)?;
    let (rest, _) = multispace0(rest)?;
    let (rest, key) = take_while1(|c: char| c.is_alphanumeric() || "_-:./+'".contains(c))(rest)?;
    let (rest, _) = multispace0(rest)?;
    let (mut rest, _) = char(',')(rest)?;

    let mut entry = BibEntry::new(key, EntryType::parse(kind));
    loop {
        let (after_ws, _) = multispace0(rest)?;
        if let Some(after) = after_ws.strip_prefix(close) {
            return Ok((after, entry));
        }
        let (after_field, (name, text)) = assignment(after_ws, macros)?;
        entry.set(&name, text);
        let (after_field, _) = multispace0(after_field)?;
        rest = after_field.strip_prefix(',').unwrap_or(after_field);
    }
}

/// `name = value`
fn assignment<'a>(input: &'a str, macros: &Macros) -> IResult<&'a str, (String, String)> {
    let (rest, _) = multispace0(input)?;
    let (rest, name) = take_while1(|c: char| c.is_ascii_alphanumeric() || "_-.:".contains(c))(rest)?;
    let (rest, _) = multispace0(rest)?;
    let (rest, _) = char('=')(rest)?;
    let (rest, _) = multispace0(rest)?;
    let (rest, text) = value(rest, macros)?;
    Ok((rest, (name.to_string(), text)))
}

/// A value made of one or more `#`-joined parts
fn value<'a>(input: &'a str, macros: &Macros) -> IResult<&'a str, String> {
    let mut out = String::new();
    let mut remaining = input;

    loop {
        let (rest, _) = multispace0(remaining)?;
        let (rest, part) = alt((
            map(braced, |s: &str| s[1..s.len() - 1].to_string()),
            quoted,
            map(take_while1(|c: char| c.is_ascii_digit()), str::to_string),
            map(
                take_while1(|c: char| c.is_ascii_alphanumeric() || "_-.:".contains(c)),
                |name: &str| macros.resolve(name),
            ),
        ))(rest)?;
        out.push_str(&part);

        let (rest, _) = multispace0(rest)?;
        match rest.strip_prefix('#') {
            Some(next) => remaining = next,
            None => return Ok((rest, out)),
        }
    }
}

/// `{...}` with nesting; returns the slice including the outer braces
fn braced(input: &str) -> IResult<&str, &str> {
    if !input.starts_with('{') {
        return Err(nom::Err::Error(nom::error::Error::new(
            input,
            nom::error::ErrorKind::Char,
        )));
    }

    let bytes = input.as_bytes();
    let mut depth = 0usize;
    let mut pos = 0;
    while pos < bytes.len() {
        match bytes[pos] {
            b'{' => depth += 1,
            b'}' => {
                depth -= 1;
                if depth == 0 {
                    return Ok((&input[pos + 1..], &input[..pos + 1]));
                }
            }
            // an escaped brace does not change depth
            b'\\' if matches!(bytes.get(pos + 1), Some(b'{') | Some(b'}')) => pos += 1,
            _ => {}
        }
        pos += 1;
    }

    Err(nom::Err::Error(nom::error::Error::new(
        input,
        nom::error::ErrorKind::TakeUntil,
    )))
}

/// `"..."`; braces inside protect embedded quotes
fn quoted(input: &str) -> IResult<&str, String> {
    let Some(body) = input.strip_prefix('"') else {
        return Err(nom::Err::Error(nom::error::Error::new(
            input,
            nom::error::ErrorKind::Char,
        )));
    };

    let mut out = String::new();
    let mut depth = 0usize;
    let mut chars = body.char_indices();
    while let Some((idx, c)) = chars.next() {
        match c {
            '"' if depth == 0 => return Ok((&body[idx + 1..], out)),
            '{' => depth += 1,
            '}' => depth = depth.saturating_sub(1),
            '\\' => {
                out.push(c);
                if let Some((_, escaped)) = chars.next() {
                    out.push(escaped);
                }
                continue;
            }
            _ => {}
        }
        out.push(c);
    }

    Err(nom::Err::Error(nom::error::Error::new(
        input,
        nom::error::ErrorKind::Char,
    )))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_simple_entry() {
        let input = r#"
@article{Smith2024,
    author = {John Smith},
    Title = {A Great Paper},
    year = 2024,
    journal = {Nature},
}
"#;
        let bib = parse(input).unwrap();
        assert_eq!(bib.entries.len(), 1);
        assert!(bib.diagnostics.is_empty());

        let entry = &bib.entries[0];
        assert_eq!(entry.key, "Smith2024");
        assert_eq!(entry.entry_type, EntryType::Article);
        assert_eq!(entry.title(), Some("A Great Paper"));
        assert_eq!(entry.year(), Some("2024"));
        assert_eq!(entry.journal(), Some("Nature"));
    }

    #[test]
    fn test_nested_braces_are_kept() {
        let bib = parse("@article{T, title = {Deep {Koopman} \\emph{Sensing}}}").unwrap();
        assert_eq!(bib.entries[0].title(), Some("Deep {Koopman} \\emph{Sensing}"));
    }

    #[test]
    fn test_quoted_value_with_unicode() {
        let bib = parse("@misc{Q, title = \"Études {\"}quoted{\"} naïve\"}").unwrap();
        assert_eq!(bib.entries[0].title(), Some("Études {\"}quoted{\"} naïve"));
    }

    #[test]
    fn test_string_macros_and_concatenation() {
        let input = r#"
@string{pre = "Physical Review"}
@article{M, journal = pre # " E", month = jan}
"#;
        let bib = parse(input).unwrap();
        assert_eq!(bib.strings, vec![("pre".to_string(), "Physical Review".to_string())]);
        assert_eq!(bib.entries[0].journal(), Some("Physical Review E"));
        assert_eq!(bib.entries[0].get("month"), Some("January"));
    }

    #[test]
    fn test_comments_and_preamble() {
        let input = "% see @article{old, title={x}}\n@comment{ignored @article{x, title={no}} }\n@preamble{\"\\newcommand{\\x}{y}\"}\n@book{B, title={Kept}}";
        let bib = parse(input).unwrap();
        assert_eq!(bib.entries.len(), 1);
        assert_eq!(bib.entries[0].key, "B");
        assert_eq!(bib.preambles.len(), 1);
        assert_eq!(bib.comments, vec!["ignored @article{x, title={no}} ".to_string()]);
    }

    #[test]
    fn test_comment_bodies_are_kept() {
        let input = "@article{b, title={B}}\n@comment{jabref-meta: databaseType:bibtex;}\n@comment plain line\n";
        let bib = parse(input).unwrap();
        assert_eq!(
            bib.comments,
            vec![
                "jabref-meta: databaseType:bibtex;".to_string(),
                "plain line".to_string()
            ]
        );
    }

    #[test]
    fn test_parenthesis_delimited_blocks() {
        let input = r#"
@string(jfm = "Journal of Fluid Mechanics")
@article(paren2020,
    title = {Round {Brackets}},
    journal = jfm
)
@article{b, title = {Braced}}
"#;
        let bib = parse(input).unwrap();
        assert!(bib.diagnostics.is_empty());
        assert_eq!(bib.entries.len(), 2);
        assert_eq!(bib.entries[0].key, "paren2020");
        assert_eq!(bib.entries[0].title(), Some("Round {Brackets}"));
        assert_eq!(bib.entries[0].journal(), Some("Journal of Fluid Mechanics"));
    }

    #[test]
    fn test_malformed_parenthesis_entry_is_reported() {
        let bib = parse("@article(, title = {no key})\n@article{b, title = {B}}").unwrap();
        assert_eq!(bib.entries.len(), 1);
        assert_eq!(bib.diagnostics.len(), 1);
        assert_eq!(bib.diagnostics[0].line, 1);
    }

    #[test]
    fn test_diagnostic_lines_after_multiline_entries() {
        let input = "@article{a,\n title = {A\n spans lines}\n}\n% note\n\n@article{, title={bad}}\n@article{c,\n title={C}}\n@article{, x}";
        let bib = parse(input).unwrap();
        let lines: Vec<u32> = bib.diagnostics.iter().map(|d| d.line).collect();
        assert_eq!(lines, vec![7, 10]);
    }

    #[test]
    fn test_parse_time_grows_linearly() {
        fn generate(count: usize) -> String {
            (0..count)
                .map(|i| {
                    format!(
                        "@article{{k{i},\n  title = {{Paper number {i}}},\n  author = {{Doe, Jane}},\n  journal = {{Nature}},\n  year = 2020\n}}\n\n"
                    )
                })
                .collect()
        }

        let small = generate(2_000);
        let large = generate(16_000);

        let start = std::time::Instant::now();
        assert_eq!(parse(&small).unwrap().entries.len(), 2_000);
        let small_time = start.elapsed();

        let start = std::time::Instant::now();
        assert_eq!(parse(&large).unwrap().entries.len(), 16_000);
        let large_time = start.elapsed();

        // eight times the input; a quadratic reader would take ~64 times as long
        assert!(
            large_time <= small_time * 24 + std::time::Duration::from_millis(100),
            "2k entries: {:?}, 16k entries: {:?}",
            small_time,
            large_time
        );
    }

    #[test]
    fn test_malformed_entry_is_skipped_with_diagnostic() {
        let input = "@article{, title = {no key}}\n\n@article{Good, title = {Fine}}";
        let bib = parse(input).unwrap();
        assert_eq!(bib.entries.len(), 1);
        assert_eq!(bib.entries[0].key, "Good");
        assert_eq!(bib.diagnostics.len(), 1);
        assert_eq!(bib.diagnostics[0].line, 1);
    }

    #[test]
    fn test_unbalanced_entry_fails() {
        let input = "@article{Ok, title={A}}\n@article{Broken, title = {never closed\n";
        assert_eq!(parse(input), Err(ParseError::Unbalanced { line: 2 }));
    }

    #[test]
    fn test_stray_at_sign_is_not_a_diagnostic() {
        let bib = parse("Contact me at someone@example.org\n@misc{M, title={T}}").unwrap();
        assert_eq!(bib.entries.len(), 1);
        assert!(bib.diagnostics.is_empty());
    }

    #[test]
    fn test_empty_input() {
        assert!(parse("").unwrap().entries.is_empty());
        assert!(parse_entry("no entries here").is_none());
    }
}
