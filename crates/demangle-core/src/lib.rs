//! Core pipeline for demangling symbol names in assembly listings.

/// Request-scoped store of mangled tokens and their replacements.
pub mod symbols;
pub use symbols::{StoreError, Symbol, SymbolStore};

/// Mangled-token recognition for single listing lines.
pub mod scanner;
pub use scanner::{find_tokens, is_mangled, scan_line, LineScan};

/// Listing line records and raw-text line splitting.
pub mod listing;
pub use listing::{split_lines, split_terminated, AsmLine, AsmText, LineFields};

/// Batched name-resolution capability and its implementations.
pub mod oracle;
pub use oracle::{
    Oracle, OracleConfig, OracleError, ProcessOracle, TableOracle, DEFAULT_TOOL, TOOL_ENV_VAR,
};

/// Pipeline progress events.
pub mod events;
pub use events::{DemangleEvent, EventSink, NullSink, TracingSink};

/// Unified error type for a demangling run.
pub mod errors;
pub use errors::DemangleError;

/// Scan/resolve/rewrite orchestration.
pub mod demangler;
pub use demangler::Demangler;

#[cfg(test)]
use proptest as _;
#[cfg(test)]
use rstest as _;
