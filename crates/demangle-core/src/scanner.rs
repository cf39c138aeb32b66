//! Mangled-token recognition for single listing lines.
//!
//! Tokens follow the Itanium C++ ABI prefix: `_Z`, or `__Z` on targets that
//! add a leading underscore to every symbol. A token:
//!
//! - starts at a prefix that is not preceded by an identifier character,
//! - has at least one identifier character after the prefix,
//! - extends over `[A-Za-z0-9_]`, plus `.` when it is immediately followed by
//!   an identifier character (clone suffixes such as `.constprop.0`).
//!
//! Everything else (`$`, `@`, `:`, `,`, brackets, whitespace, a trailing `.`)
//! ends a token. Matching is maximal munch from each start position.
//!
//! The scanner only reports byte spans. Rewriting is left to the caller.

use std::ops::Range;

/// Result of scanning one line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineScan {
    /// The whole trimmed line is `<token>:`. The span covers the token only.
    Definition(Range<usize>),
    /// Zero or more inline token occurrences, in line order.
    References(Vec<Range<usize>>),
}

impl LineScan {
    /// Byte spans of every token occurrence on the line.
    #[must_use]
    pub fn spans(&self) -> &[Range<usize>] {
        match self {
            Self::Definition(span) => std::slice::from_ref(span),
            Self::References(spans) => spans,
        }
    }

    /// Returns true if the line holds no token.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.spans().is_empty()
    }

    /// Returns true if the line is a label definition.
    #[must_use]
    pub const fn is_definition(&self) -> bool {
        matches!(self, Self::Definition(_))
    }

    /// Token text of every occurrence, borrowed from `line`.
    pub fn tokens<'a>(&'a self, line: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.spans().iter().map(move |span| &line[span.clone()])
    }
}

/// Scans a line for a label definition or inline references.
#[must_use]
pub fn scan_line(line: &str) -> LineScan {
    let body = line.trim();
    if let Some(name) = body.strip_suffix(':') {
        if is_mangled(name) {
            let start = line.len() - line.trim_start().len();
            return LineScan::Definition(start..start + name.len());
        }
    }
    LineScan::References(find_tokens(line))
}

/// Finds every maximal token in `text`, left to right.
#[must_use]
pub fn find_tokens(text: &str) -> Vec<Range<usize>> {
    let bytes = text.as_bytes();
    let mut spans = Vec::new();
    let mut pos = 0;
    while pos < bytes.len() {
        match token_end(bytes, pos) {
            Some(end) => {
                spans.push(pos..end);
                pos = end;
            }
            None => pos += 1,
        }
    }
    spans
}

/// Returns true if `text` is exactly one token.
#[must_use]
pub fn is_mangled(text: &str) -> bool {
    token_end(text.as_bytes(), 0) == Some(text.len())
}

const fn is_ident_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_'
}

fn is_ident_at(bytes: &[u8], pos: usize) -> bool {
    bytes.get(pos).copied().is_some_and(is_ident_byte)
}

fn prefix_len(rest: &[u8]) -> Option<usize> {
    if rest.starts_with(b"__Z") {
        Some(3)
    } else if rest.starts_with(b"_Z") {
        Some(2)
    } else {
        None
    }
}

/// End offset of the token starting at `start`, if one starts there.
fn token_end(bytes: &[u8], start: usize) -> Option<usize> {
    if start > 0 && is_ident_byte(bytes[start - 1]) {
        return None;
    }
    let mut end = start + prefix_len(&bytes[start..])?;
    if !is_ident_at(bytes, end) {
        return None;
    }
    loop {
        if is_ident_at(bytes, end) {
            end += 1;
        } else if bytes.get(end) == Some(&b'.') && is_ident_at(bytes, end + 1) {
            end += 2;
        } else {
            return Some(end);
        }
    }
}
