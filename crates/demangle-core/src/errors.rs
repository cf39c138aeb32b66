//! Unified error type for a demangling run.

use thiserror::Error;

use crate::oracle::OracleError;
use crate::symbols::StoreError;

/// Failure of a whole demangling run. No partial listing is produced.
#[derive(Debug, Error)]
pub enum DemangleError {
    /// The oracle could not resolve the batch.
    #[error(transparent)]
    Oracle(#[from] OracleError),
    /// The oracle's answer did not line up with the batch.
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl DemangleError {
    /// Returns true for a batch length mismatch.
    #[must_use]
    pub const fn is_length_mismatch(&self) -> bool {
        matches!(self, Self::Store(StoreError::LengthMismatch { .. }))
    }
}
