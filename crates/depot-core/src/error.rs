//! # Validation Errors
//!
//! Structured errors for domain primitive construction, built with `thiserror`.
//! Each variant carries the rejected input so operators can see exactly what
//! a client sent.

use thiserror::Error;

/// Validation errors for [`ArtifactName`](crate::ArtifactName) and request input.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// No file was supplied where one is required.
    #[error("No file provided")]
    MissingFile,

    /// The file name does not carry the archive extension.
    #[error("Only ZIP files are allowed (got \"{0}\")")]
    WrongExtension(String),

    /// The file name is empty or has nothing before the extension.
    #[error("file name must not be empty")]
    EmptyName,

    /// The file name is longer than the storage layer accepts.
    #[error("file name is {len} bytes long (max {max})")]
    NameTooLong {
        /// Length of the rejected name in bytes.
        len: usize,
        /// Maximum accepted length in bytes.
        max: usize,
    },

    /// The file name is not a single plain path component.
    #[error("invalid file name \"{0}\": must be a plain file name without path separators or a leading dot")]
    InvalidName(String),
}
