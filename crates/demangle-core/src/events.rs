//! Pipeline progress events and the sink trait that receives them.

/// Progress event emitted by the demangler, in pipeline order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DemangleEvent {
    /// Every line has been scanned.
    ScanComplete {
        /// Number of lines in the listing.
        lines: usize,
        /// Number of distinct tokens found.
        symbols: usize,
    },
    /// No tokens were found, so the oracle was not called.
    BatchSkipped,
    /// The oracle answered and every symbol is resolved.
    BatchResolved {
        /// Number of symbols resolved.
        symbols: usize,
    },
    /// Every line holding a token has been rewritten.
    RewriteComplete {
        /// Number of lines whose text changed.
        rewritten_lines: usize,
    },
}

/// Receiver for [`DemangleEvent`]s.
///
/// Sinks are shared by concurrent calls, so they receive events through a
/// shared reference.
pub trait EventSink: Send + Sync {
    /// Records an event.
    fn on_event(&self, event: DemangleEvent);
}

impl<T: EventSink + ?Sized> EventSink for &T {
    fn on_event(&self, event: DemangleEvent) {
        (**self).on_event(event);
    }
}

/// Sink that forwards events to `tracing` at debug level.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl EventSink for TracingSink {
    fn on_event(&self, event: DemangleEvent) {
        match event {
            DemangleEvent::ScanComplete { lines, symbols } => {
                tracing::debug!(lines, symbols, "scanned listing");
            }
            DemangleEvent::BatchSkipped => tracing::debug!("no mangled symbols found"),
            DemangleEvent::BatchResolved { symbols } => {
                tracing::debug!(symbols, "resolved symbol batch");
            }
            DemangleEvent::RewriteComplete { rewritten_lines } => {
                tracing::debug!(rewritten_lines, "rewrote listing");
            }
        }
    }
}

/// Sink that drops every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

impl EventSink for NullSink {
    fn on_event(&self, _event: DemangleEvent) {}
}
