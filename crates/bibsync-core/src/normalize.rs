//! Title keys for duplicate matching
//!
//! Two records are the same work when their title keys are equal. The key is
//! a best-effort textual strip of LaTeX markup, not a LaTeX parser:
//! - control words (`\emph`, `\textbf`, ...) are removed, their braced
//!   arguments are kept
//! - braces are removed
//! - the rest is lowercased and reduced to letters and digits
//!
//! Control symbols such as `\'e` or `\&` are left to the alphanumeric filter,
//! so `Caf\'e` keys as `cafe` while `Café` keys as `café`.

use lazy_static::lazy_static;
use regex::Regex;

use crate::record::Record;

lazy_static! {
    /// A backslash followed by a maximal run of ASCII letters
    static ref CONTROL_WORD: Regex = Regex::new(r"\\[a-zA-Z]+").unwrap();
}

/// Normalize a free-text title into its comparison key
pub fn normalize_title(title: &str) -> String {
    if title.is_empty() {
        return String::new();
    }

    let stripped = CONTROL_WORD.replace_all(title, "");
    stripped
        .chars()
        .filter(|c| *c != '{' && *c != '}')
        .flat_map(char::to_lowercase)
        .filter(|c| c.is_alphanumeric())
        .collect()
}

/// Title key of a record, `None` when the record has no usable title
///
/// A record without a key never matches anything.
pub fn title_key<R: Record + ?Sized>(record: &R) -> Option<String> {
    record
        .title()
        .map(normalize_title)
        .filter(|key| !key.is_empty())
}
