//! # Current-Build Pointer
//!
//! The pointer record is the sole source of truth for which artifact is
//! current. It is persisted as `{"currentFile": string | null}` in a sidecar
//! file next to the artifacts.

use serde::{Deserialize, Serialize};

use crate::artifact::ArtifactName;

/// File name of the pointer sidecar inside the uploads directory.
pub const POINTER_FILE_NAME: &str = "metadata.json";

/// The persisted pointer naming the current artifact, if any.
///
/// A missing `currentFile` key deserializes as `None`, matching records
/// written by older tooling that omitted the field.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PointerRecord {
    /// The current artifact, or `None` when the slot is empty.
    #[serde(default)]
    pub current_file: Option<ArtifactName>,
}

impl PointerRecord {
    /// A pointer naming no artifact.
    pub fn empty() -> Self {
        Self { current_file: None }
    }

    /// A pointer naming `name`.
    pub fn pointing_at(name: ArtifactName) -> Self {
        Self {
            current_file: Some(name),
        }
    }

    /// Whether this pointer names an artifact.
    pub fn is_set(&self) -> bool {
        self.current_file.is_some()
    }
}

/// Observed state of the build slot.
///
/// `Dangling` is transient: the next query heals it to `Empty`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", content = "fileName", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SlotState {
    /// Pointer is null (or absent).
    Empty,
    /// Pointer names an artifact that exists in storage.
    Present(ArtifactName),
    /// Pointer names an artifact that is missing from storage.
    Dangling(ArtifactName),
}

impl SlotState {
    /// Classify a pointer against artifact existence.
    ///
    /// `exists` is only consulted when the pointer is set.
    pub fn classify(record: &PointerRecord, exists: impl FnOnce(&ArtifactName) -> bool) -> Self {
        match &record.current_file {
            None => Self::Empty,
            Some(name) if exists(name) => Self::Present(name.clone()),
            Some(name) => Self::Dangling(name.clone()),
        }
    }

    /// The artifact currently advertised to players, if any.
    ///
    /// A dangling pointer advertises nothing.
    pub fn current(&self) -> Option<&ArtifactName> {
        match self {
            Self::Present(name) => Some(name),
            Self::Empty | Self::Dangling(_) => None,
        }
    }

    /// Return the string representation of this state.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Empty => "EMPTY",
            Self::Present(_) => "PRESENT",
            Self::Dangling(_) => "DANGLING",
        }
    }
}

impl std::fmt::Display for SlotState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Empty => f.write_str("EMPTY"),
            Self::Present(name) | Self::Dangling(name) => write!(f, "{} {name}", self.as_str()),
        }
    }
}
