#![deny(missing_docs)]

//! # depot-core -- Foundational Types for Depot
//!
//! Depot keeps exactly one downloadable game build "current" and serves it
//! to players. This crate holds the types every other crate in the workspace
//! agrees on. It performs no I/O.
//!
//! ## Design Principles
//!
//! 1. **Names are validated once.** An [`ArtifactName`] can only be built
//!    through [`ArtifactName::new`], so storage code never joins an unchecked
//!    client string onto a directory.
//!
//! 2. **The pointer record has one wire shape.** [`PointerRecord`] serializes
//!    as `{"currentFile": string | null}`, the format of the `metadata.json`
//!    sidecar next to the artifacts.
//!
//! 3. **Slot state is explicit.** [`SlotState`] names the three states a
//!    build slot can be observed in: empty, present, dangling.

pub mod artifact;
pub mod error;
pub mod pointer;

pub use artifact::{ArtifactName, ARTIFACT_EXTENSION, MAX_NAME_LEN};
pub use error::ValidationError;
pub use pointer::{PointerRecord, SlotState, POINTER_FILE_NAME};
