//! # depot-store -- Build-Pointer Store
//!
//! Maintains at most one "current build" artifact on durable storage plus a
//! small pointer record naming it, and serves query, replace, and delete
//! over them.
//!
//! ## Layout
//!
//! ```text
//! {uploads_dir}/
//!   metadata.json        {"currentFile": "game-v2.zip"}
//!   game-v2.zip          current artifact
//!   .game-v3.zip.partial in-flight upload (renamed into place on success)
//! ```
//!
//! ## Seams
//!
//! - [`PointerStore`] persists the pointer record. [`JsonPointerStore`] is
//!   the sidecar-file implementation, [`MemoryPointerStore`] the in-process one.
//! - [`ArtifactStorage`] holds artifact bytes by name. [`FsArtifactStorage`]
//!   writes into a directory, [`MemoryArtifactStorage`] into a map.
//! - [`BuildSlot`] composes one of each and is the only type that mutates
//!   both. All of its operations run under a single mutex.
//!
//! ## Slot States
//!
//! ```text
//!            upload                 upload
//!   EMPTY ───────────▶ PRESENT ◀──────────┐
//!     ▲                  │  └──────────────┘
//!     │     delete       │
//!     ├──────────────────┘
//!     │  query / delete
//!     └──────────────── DANGLING   (pointer set, file missing)
//! ```

pub mod error;
pub mod pointer;
pub mod slot;
pub mod storage;

pub use error::StoreError;
pub use pointer::{JsonPointerStore, MemoryPointerStore, PointerStore};
pub use slot::{BuildSlot, DeleteOutcome, ReplacePolicy, UploadReceipt};
pub use storage::{ArtifactStorage, FsArtifactStorage, MemoryArtifactStorage};

/// A slot over the on-disk layout: sidecar pointer plus artifact directory.
pub type FsBuildSlot = BuildSlot<JsonPointerStore, FsArtifactStorage>;

/// Open the on-disk slot rooted at `uploads_dir`.
///
/// Nothing is created until the first operation runs.
pub fn open_dir(uploads_dir: impl Into<std::path::PathBuf>) -> FsBuildSlot {
    let dir = uploads_dir.into();
    BuildSlot::new(
        JsonPointerStore::in_dir(&dir),
        FsArtifactStorage::new(dir),
    )
}
