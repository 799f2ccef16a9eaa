//! # Store Errors
//!
//! Every fault the store can hit, with the path and operation that failed.
//! Stale pointers are not errors: the slot heals them.

use std::path::PathBuf;

use depot_core::ValidationError;
use thiserror::Error;

/// Errors from build-pointer store operations.
#[derive(Error, Debug)]
pub enum StoreError {
    /// The declared file name or payload was rejected. No side effects occurred.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// A storage I/O operation failed.
    #[error("{op} failed for {}: {source}", path.display())]
    Io {
        /// The operation that failed (e.g. "write artifact").
        op: &'static str,
        /// The path being operated on.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// The pointer record exists but could not be parsed.
    #[error("pointer record at {} is corrupt: {source}", path.display())]
    CorruptPointer {
        /// Location of the pointer record.
        path: PathBuf,
        /// Parse error.
        source: serde_json::Error,
    },
}

impl StoreError {
    pub(crate) fn io(op: &'static str, path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            op,
            path: path.into(),
            source,
        }
    }

    /// Whether the caller sent bad input, as opposed to a storage fault.
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }
}
