//! Three-phase demangling pipeline.
//!
//! 1. **Scan** every line and record each token in a fresh [`SymbolStore`].
//! 2. **Resolve** the distinct tokens with a single oracle batch, skipped
//!    entirely when the listing holds no tokens.
//! 3. **Rewrite** every occurrence with its resolved name.
//!
//! No line is rewritten before the whole batch is resolved, so a token gets
//! the same replacement at its definition and at every reference. If the
//! oracle fails the run fails and the listing is dropped, never returned
//! half rewritten.

use std::ops::Range;

use crate::errors::DemangleError;
use crate::events::{DemangleEvent, EventSink, TracingSink};
use crate::listing::{split_terminated, AsmText};
use crate::oracle::Oracle;
use crate::scanner::{scan_line, LineScan};
use crate::symbols::SymbolStore;

/// Listing demangler over an injected oracle and event sink.
///
/// The demangler holds no per-listing state: each call builds its own
/// symbol store, so one instance can serve concurrent calls.
#[derive(Debug, Clone)]
pub struct Demangler<O, S = TracingSink> {
    oracle: O,
    sink: S,
}

impl<O: Oracle> Demangler<O> {
    /// Creates a demangler that logs progress through `tracing`.
    pub const fn new(oracle: O) -> Self {
        Self {
            oracle,
            sink: TracingSink,
        }
    }
}

impl<O: Oracle, S: EventSink> Demangler<O, S> {
    /// Replaces the event sink.
    pub fn with_sink<T: EventSink>(self, sink: T) -> Demangler<O, T> {
        Demangler {
            oracle: self.oracle,
            sink,
        }
    }

    /// The oracle used to resolve batches.
    pub const fn oracle(&self) -> &O {
        &self.oracle
    }

    /// Demangles every token in `listing`.
    ///
    /// The returned listing has the same length and order; only line text
    /// changes, and only on lines holding a token.
    ///
    /// # Errors
    ///
    /// Returns [`DemangleError::Oracle`] if the oracle fails and
    /// [`DemangleError::Store`] if its answer does not match the batch.
    pub async fn process<L: AsmText>(&self, mut listing: Vec<L>) -> Result<Vec<L>, DemangleError> {
        let mut store = SymbolStore::new();
        let scans: Vec<LineScan> = listing.iter().map(|line| scan_line(line.text())).collect();
        for (line, scan) in listing.iter().zip(&scans) {
            for token in scan.tokens(line.text()) {
                store.add(token);
            }
        }
        self.sink.on_event(DemangleEvent::ScanComplete {
            lines: listing.len(),
            symbols: store.len(),
        });

        if store.is_empty() {
            self.sink.on_event(DemangleEvent::BatchSkipped);
            self.sink
                .on_event(DemangleEvent::RewriteComplete { rewritten_lines: 0 });
            return Ok(listing);
        }

        let names = self.oracle.demangle_batch(&store.ordered_tokens()).await?;
        store.resolve(names)?;
        self.sink.on_event(DemangleEvent::BatchResolved {
            symbols: store.len(),
        });

        let mut rewritten_lines = 0;
        for (line, scan) in listing.iter_mut().zip(&scans) {
            if scan.is_empty() {
                continue;
            }
            let text = splice(line.text(), scan.spans(), &store);
            if text != line.text() {
                rewritten_lines += 1;
            }
            line.set_text(text);
        }
        self.sink
            .on_event(DemangleEvent::RewriteComplete { rewritten_lines });

        Ok(listing)
    }

    /// Demangles a raw listing held in a single string.
    ///
    /// Lines are split with [`split_terminated`] and each is written back
    /// with its own terminator, so `\r\n` endings and a missing final
    /// newline survive unchanged.
    ///
    /// # Errors
    ///
    /// Same as [`Demangler::process`].
    pub async fn process_text(&self, text: &str) -> Result<String, DemangleError> {
        let (lines, endings): (Vec<String>, Vec<&str>) = split_terminated(text)
            .into_iter()
            .map(|(line, end)| (line.to_owned(), end))
            .unzip();
        let lines = self.process(lines).await?;
        let mut out = String::with_capacity(text.len());
        for (line, end) in lines.iter().zip(endings) {
            out.push_str(line);
            out.push_str(end);
        }
        Ok(out)
    }
}

/// Rebuilds `text` with each span replaced by its resolved name.
fn splice(text: &str, spans: &[Range<usize>], store: &SymbolStore) -> String {
    let mut out = String::with_capacity(text.len());
    let mut cursor = 0;
    for span in spans {
        out.push_str(&text[cursor..span.start]);
        out.push_str(store.lookup(&text[span.clone()]));
        cursor = span.end;
    }
    out.push_str(&text[cursor..]);
    out
}
