//! Request-scoped symbol store.
//!
//! The store records every mangled token seen while scanning a listing, in
//! first-seen order. That order is the batch handed to the oracle, and the
//! oracle's answers are assigned back by position.

use std::collections::HashMap;

use thiserror::Error;

/// A mangled token and its (eventual) demangled replacement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Symbol {
    /// The mangled token exactly as it appears in the listing.
    pub mangled: String,
    /// The demangled text, unset until the batch is resolved.
    pub demangled: Option<String>,
    /// Position of the token in first-seen order.
    pub index: usize,
}

/// Error raised while resolving a batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum StoreError {
    /// The oracle answered with a different number of names than requested.
    #[error("oracle returned {actual} names for a batch of {expected} symbols")]
    LengthMismatch {
        /// Number of tokens in the batch.
        expected: usize,
        /// Number of names returned.
        actual: usize,
    },
}

/// Insertion-ordered mapping from mangled token to demangled text.
#[derive(Debug, Clone, Default)]
pub struct SymbolStore {
    symbols: Vec<Symbol>,
    by_token: HashMap<String, usize>,
}

impl SymbolStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a token, returning its insertion index.
    ///
    /// Adding a token that is already present is a no-op and returns the
    /// index it was first given.
    pub fn add(&mut self, token: &str) -> usize {
        if let Some(&index) = self.by_token.get(token) {
            return index;
        }
        let index = self.symbols.len();
        self.symbols.push(Symbol {
            mangled: token.to_owned(),
            demangled: None,
            index,
        });
        self.by_token.insert(token.to_owned(), index);
        index
    }

    /// Number of distinct tokens recorded.
    #[must_use]
    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    /// Returns true if no token has been recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    /// Distinct tokens in first-seen order. This is the oracle batch.
    #[must_use]
    pub fn ordered_tokens(&self) -> Vec<String> {
        self.symbols.iter().map(|s| s.mangled.clone()).collect()
    }

    /// Assigns demangled names positionally to the recorded tokens.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::LengthMismatch`] if `results` does not hold
    /// exactly one name per recorded token. The store is left untouched.
    pub fn resolve(&mut self, results: Vec<String>) -> Result<(), StoreError> {
        if results.len() != self.symbols.len() {
            return Err(StoreError::LengthMismatch {
                expected: self.symbols.len(),
                actual: results.len(),
            });
        }
        for (symbol, name) in self.symbols.iter_mut().zip(results) {
            symbol.demangled = Some(name);
        }
        Ok(())
    }

    /// Returns the replacement text for a token.
    ///
    /// Unknown or unresolved tokens come back unchanged.
    #[must_use]
    pub fn lookup<'a>(&'a self, token: &'a str) -> &'a str {
        self.get(token)
            .and_then(|s| s.demangled.as_deref())
            .unwrap_or(token)
    }

    /// Returns the symbol recorded for a token, if any.
    #[must_use]
    pub fn get(&self, token: &str) -> Option<&Symbol> {
        self.by_token.get(token).map(|&i| &self.symbols[i])
    }

    /// Iterates over symbols in first-seen order.
    pub fn iter(&self) -> impl Iterator<Item = &Symbol> {
        self.symbols.iter()
    }
}
