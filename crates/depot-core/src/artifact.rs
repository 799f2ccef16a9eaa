//! # Artifact Names
//!
//! A build artifact is stored under the file name the uploader declared.
//! [`ArtifactName`] is the validated form of that name.
//!
//! ## Validation
//!
//! - Must end in [`ARTIFACT_EXTENSION`] (case-sensitive).
//! - Must have a non-empty stem before the extension.
//! - Must be a single path component: no `/`, `\`, NUL, `.` or `..`.
//! - Must not start with `.`; dot-files are reserved for the store's
//!   temporary files and the pointer sidecar.
//! - At most [`MAX_NAME_LEN`] bytes.

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// File extension every artifact must carry.
pub const ARTIFACT_EXTENSION: &str = ".zip";

/// Maximum artifact name length in bytes (common filesystem limit).
pub const MAX_NAME_LEN: usize = 255;

/// A validated artifact file name.
///
/// Serializes as a plain string. Deserialization re-runs validation, so a
/// hand-edited pointer file cannot smuggle a path into the store.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ArtifactName(String);

impl ArtifactName {
    /// Validate a declared file name.
    ///
    /// # Errors
    ///
    /// Returns the first [`ValidationError`] the name violates. An empty
    /// string is reported as [`ValidationError::EmptyName`].
    pub fn new(value: impl Into<String>) -> Result<Self, ValidationError> {
        let s = value.into();
        if s.is_empty() {
            return Err(ValidationError::EmptyName);
        }
        if s.len() > MAX_NAME_LEN {
            return Err(ValidationError::NameTooLong {
                len: s.len(),
                max: MAX_NAME_LEN,
            });
        }
        if s.contains(['/', '\\', '\0']) || s.starts_with('.') {
            return Err(ValidationError::InvalidName(s));
        }
        let Some(stem) = s.strip_suffix(ARTIFACT_EXTENSION) else {
            return Err(ValidationError::WrongExtension(s));
        };
        if stem.is_empty() {
            return Err(ValidationError::EmptyName);
        }
        Ok(Self(s))
    }

    /// Access the file name.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The name without the archive extension, e.g. `game-v1` for `game-v1.zip`.
    pub fn stem(&self) -> &str {
        &self.0[..self.0.len() - ARTIFACT_EXTENSION.len()]
    }

    /// Consume the name, returning the inner string.
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl std::fmt::Display for ArtifactName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::str::FromStr for ArtifactName {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for ArtifactName {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<ArtifactName> for String {
    fn from(name: ArtifactName) -> Self {
        name.0
    }
}

impl AsRef<str> for ArtifactName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl PartialEq<&str> for ArtifactName {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

impl PartialEq<str> for ArtifactName {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_plain_zip_names() {
        for name in ["game-v1.zip", "Game Build 2.zip", "a.zip", "build.tar.zip"] {
            let n = ArtifactName::new(name).unwrap();
            assert_eq!(n, name);
        }
    }

    #[test]
    fn stem_strips_extension() {
        let n = ArtifactName::new("game-v2.zip").unwrap();
        assert_eq!(n.stem(), "game-v2");
    }

    #[test]
    fn rejects_other_extensions() {
        assert_eq!(
            ArtifactName::new("notes.txt"),
            Err(ValidationError::WrongExtension("notes.txt".into()))
        );
        // Extension check is case-sensitive.
        assert!(matches!(
            ArtifactName::new("GAME.ZIP"),
            Err(ValidationError::WrongExtension(_))
        ));
    }

    #[test]
    fn rejects_empty_and_bare_extension() {
        assert_eq!(ArtifactName::new(""), Err(ValidationError::EmptyName));
        // ".zip" has a leading dot, which is reserved.
        assert!(matches!(
            ArtifactName::new(".zip"),
            Err(ValidationError::InvalidName(_))
        ));
    }

    #[test]
    fn rejects_path_components() {
        for name in ["../escape.zip", "dir/game.zip", "dir\\game.zip", "..", "nul\0.zip"] {
            assert!(
                matches!(ArtifactName::new(name), Err(ValidationError::InvalidName(_))),
                "{name:?} should be rejected"
            );
        }
    }

    #[test]
    fn rejects_hidden_names() {
        assert!(matches!(
            ArtifactName::new(".partial-game.zip"),
            Err(ValidationError::InvalidName(_))
        ));
    }

    #[test]
    fn rejects_overlong_names() {
        let name = format!("{}.zip", "a".repeat(MAX_NAME_LEN));
        assert!(matches!(
            ArtifactName::new(name),
            Err(ValidationError::NameTooLong { max: MAX_NAME_LEN, .. })
        ));
    }

    #[test]
    fn serde_is_transparent_and_validating() {
        let n = ArtifactName::new("game.zip").unwrap();
        assert_eq!(serde_json::to_string(&n).unwrap(), "\"game.zip\"");

        let back: ArtifactName = serde_json::from_str("\"game.zip\"").unwrap();
        assert_eq!(back, n);

        assert!(serde_json::from_str::<ArtifactName>("\"../etc/passwd\"").is_err());
    }
}
