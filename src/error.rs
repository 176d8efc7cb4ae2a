//! Error kinds surfaced by the core container.
//!
//! Mirrors the hand-rolled `#[derive(Debug)]` error enums used throughout the
//! rest of this crate's lineage (see `repo::pile::LoadError` and friends):
//! one flat enum per failure family, manual `From` conversions where a cause
//! is wrapped, and a small manual `Display` impl rather than a derive macro.

use std::fmt;

/// Errors surfaced by [`crate::HashTrie`] operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TrieError {
    /// An indexed lookup (as opposed to `get_or`) found no entry for the key.
    MissingKey,
    /// `insert`/`delete` (or any other mutation) was attempted on a
    /// container whose root is not mutable. Call [`crate::HashTrie::branch`]
    /// or [`crate::HashTrie::get_mutable_version`] first.
    ImmutableMutation,
    /// An internal invariant was violated. Only surfaces when the process
    /// debug-assertion level (see [`crate::assert_level`]) is at least 1;
    /// indicates a bug in this crate rather than caller misuse.
    InvariantViolation(String),
}

impl fmt::Display for TrieError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TrieError::MissingKey => write!(f, "key not present in container"),
            TrieError::ImmutableMutation => {
                write!(f, "mutation attempted on an immutable container; branch it first")
            }
            TrieError::InvariantViolation(msg) => write!(f, "internal invariant violated: {msg}"),
        }
    }
}

impl std::error::Error for TrieError {}

pub(crate) fn invariant_violation(msg: impl Into<String>) -> TrieError {
    TrieError::InvariantViolation(msg.into())
}
