//! # depot-cli -- Operator CLI for Depot
//!
//! Works directly on an uploads directory, bypassing the HTTP service. Use
//! it on the host that owns the directory. Its slot lock lives in the CLI
//! process only, so nothing stops a running server from writing the same
//! directory at the same time. Stop the server, or go through the HTTP
//! API, before uploading or deleting.
//!
//! ## Subcommands
//!
//! - `depot current` -- print the current build, healing a dangling pointer.
//! - `depot status` -- print `empty`, `present <name>` or `dangling <name>` without touching anything.
//! - `depot upload <path>` -- make a local archive the current build.
//! - `depot delete` -- remove the current build.
//!
//! ```bash
//! depot --dir /srv/depot/uploads upload target/game-v3.zip
//! depot --dir /srv/depot/uploads status
//! ```

pub mod build;

use std::path::PathBuf;

/// Uploads directory used when neither `--dir` nor `UPLOADS_DIR` is given.
pub const DEFAULT_UPLOADS_DIR: &str = "public/uploads";

/// Resolve the uploads directory from the flag, falling back to the default.
pub fn uploads_dir(flag: Option<PathBuf>) -> PathBuf {
    flag.unwrap_or_else(|| PathBuf::from(DEFAULT_UPLOADS_DIR))
}
