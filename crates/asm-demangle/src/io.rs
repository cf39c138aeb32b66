//! Reading, demangling and writing whole listing documents.
//!
//! Two document shapes are supported:
//! - **Text**: raw assembly, one line per listing line.
//! - **JSON**: an array of line objects with a `text` field, or a compiler
//!   result object holding that array under `asm`. Every other field, of the
//!   lines and of the result object, is written back unchanged and in order.

use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use demangle_core::{AsmLine, DemangleError, Demangler, EventSink, Oracle};
use serde_json::Value;
use thiserror::Error;

/// Shape of an input/output listing document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ListingFormat {
    /// Raw assembly text.
    #[default]
    Text,
    /// JSON array of line objects, bare or under a result object's `asm` key.
    Json,
}

/// Error while handling a listing document.
#[derive(Debug, Error)]
pub enum ListingError {
    /// The input could not be read.
    #[error("failed to read {}: {source}", display_path(.path.as_deref(), "stdin"))]
    Read {
        /// Input file, or `None` for stdin.
        path: Option<PathBuf>,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
    /// The output could not be written.
    #[error("failed to write {}: {source}", display_path(.path.as_deref(), "stdout"))]
    Write {
        /// Output file, or `None` for stdout.
        path: Option<PathBuf>,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
    /// The JSON listing could not be parsed or produced.
    #[error("invalid JSON listing: {0}")]
    Json(#[from] serde_json::Error),
    /// A JSON result object has no `asm` listing.
    #[error("JSON listing object has no \"asm\" field")]
    MissingAsm,
    /// The demangling run failed.
    #[error(transparent)]
    Demangle(#[from] DemangleError),
}

fn display_path(path: Option<&Path>, fallback: &str) -> String {
    path.map_or_else(|| fallback.to_string(), |p| p.display().to_string())
}

/// Reads the whole input document from a file, or stdin when `path` is `None`.
///
/// # Errors
///
/// Returns [`ListingError::Read`] on I/O failure or non-UTF-8 input.
pub fn read_input(path: Option<&Path>) -> Result<String, ListingError> {
    let read_error = |source| ListingError::Read {
        path: path.map(Path::to_path_buf),
        source,
    };
    match path {
        Some(path) => std::fs::read_to_string(path).map_err(read_error),
        None => {
            let mut text = String::new();
            std::io::stdin()
                .read_to_string(&mut text)
                .map_err(read_error)?;
            Ok(text)
        }
    }
}

/// Writes the output document to a file, or stdout when `path` is `None`.
///
/// # Errors
///
/// Returns [`ListingError::Write`] on I/O failure.
pub fn write_output(path: Option<&Path>, text: &str) -> Result<(), ListingError> {
    let write_error = |source| ListingError::Write {
        path: path.map(Path::to_path_buf),
        source,
    };
    match path {
        Some(path) => std::fs::write(path, text).map_err(write_error),
        None => {
            let mut stdout = std::io::stdout().lock();
            stdout
                .write_all(text.as_bytes())
                .and_then(|()| stdout.flush())
                .map_err(write_error)
        }
    }
}

/// Demangles a whole document and renders it in the same format.
///
/// # Errors
///
/// Returns [`ListingError::Json`] for malformed JSON input,
/// [`ListingError::MissingAsm`] for a result object without a listing and
/// [`ListingError::Demangle`] if the demangling run fails.
pub async fn demangle_document<O: Oracle, S: EventSink>(
    demangler: &Demangler<O, S>,
    input: &str,
    format: ListingFormat,
) -> Result<String, ListingError> {
    match format {
        ListingFormat::Text => Ok(demangler.process_text(input).await?),
        ListingFormat::Json => {
            let mut document: Value = serde_json::from_str(input)?;
            let listing = match &mut document {
                Value::Object(result) => result.get_mut("asm").ok_or(ListingError::MissingAsm)?,
                other => other,
            };
            let lines: Vec<AsmLine> = serde_json::from_value(listing.take())?;
            tracing::debug!(lines = lines.len(), "parsed JSON listing");
            *listing = serde_json::to_value(demangler.process(lines).await?)?;
            let mut out = serde_json::to_string_pretty(&document)?;
            out.push('\n');
            Ok(out)
        }
    }
}
