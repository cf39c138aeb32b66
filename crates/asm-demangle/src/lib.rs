//! Command-line front end for demangling assembly listings.

use tokio as _;

/// Listing document input, output and format handling.
pub mod io;
/// `tracing` subscriber setup.
pub mod logging;
