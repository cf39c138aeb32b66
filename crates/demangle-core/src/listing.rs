//! Listing line records.
//!
//! The pipeline only reads and replaces line text. Any other data a line
//! carries passes through untouched, so the orchestrator works on anything
//! implementing [`AsmText`].

/// Access to the mutable text of a listing line.
pub trait AsmText {
    /// The current line text.
    fn text(&self) -> &str;
    /// Replaces the line text.
    fn set_text(&mut self, text: String);
}

impl AsmText for String {
    fn text(&self) -> &str {
        self
    }

    fn set_text(&mut self, text: String) {
        *self = text;
    }
}

/// Fields of a listing line other than its text.
pub type LineFields = serde_json::Map<String, serde_json::Value>;

/// One line of an assembly listing.
///
/// Every field other than `text` is held as opaque JSON in `fields` and
/// written back as it was read, including `null` values and keys the
/// demangler knows nothing about.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct AsmLine {
    /// Line text; the only field the demangler rewrites.
    pub text: String,
    /// Any other fields, kept verbatim and in input order.
    #[cfg_attr(feature = "serde", serde(flatten))]
    pub fields: LineFields,
}

impl AsmLine {
    /// Creates a line with no other fields.
    #[must_use]
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            fields: LineFields::new(),
        }
    }

    /// Adds a field that travels with the line untouched.
    #[must_use]
    pub fn with_field(
        mut self,
        key: impl Into<String>,
        value: impl Into<serde_json::Value>,
    ) -> Self {
        self.fields.insert(key.into(), value.into());
        self
    }
}

impl AsmText for AsmLine {
    fn text(&self) -> &str {
        &self.text
    }

    fn set_text(&mut self, text: String) {
        self.text = text;
    }
}

/// Splits raw listing text into lines.
///
/// Accepts `\n` and `\r\n` endings. A final line terminator does not produce
/// an extra empty line.
#[must_use]
pub fn split_lines(text: &str) -> Vec<String> {
    let mut lines: Vec<String> = text
        .split('\n')
        .map(|line| line.strip_suffix('\r').unwrap_or(line).to_owned())
        .collect();
    if lines.last().is_some_and(String::is_empty) {
        lines.pop();
    }
    lines
}

/// Splits raw listing text into `(line, terminator)` pairs.
///
/// The terminator is `"\n"`, `"\r\n"`, or empty for a final unterminated
/// line, so concatenating every pair gives back `text` exactly.
#[must_use]
pub fn split_terminated(text: &str) -> Vec<(&str, &str)> {
    text.split_inclusive('\n')
        .map(|raw| {
            let body = raw
                .strip_suffix("\r\n")
                .or_else(|| raw.strip_suffix('\n'))
                .unwrap_or(raw);
            raw.split_at(body.len())
        })
        .collect()
}
