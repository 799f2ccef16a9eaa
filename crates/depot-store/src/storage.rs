//! Artifact byte storage.
//!
//! Artifacts are stored under their validated [`ArtifactName`] in a single
//! flat location. Writes are atomic per artifact: bytes land in a
//! dot-prefixed `.partial` file that is renamed over the target only once
//! fully flushed. Since valid names never start with `.`, in-flight files
//! cannot collide with artifacts or be advertised as current.

use std::collections::HashMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use depot_core::ArtifactName;
use parking_lot::RwLock;

use crate::error::StoreError;

/// Storage for artifact bytes, keyed by name.
pub trait ArtifactStorage: Send + Sync {
    /// Create the storage location if absent.
    fn ensure_root(&self) -> Result<(), StoreError>;

    /// Whether the storage location exists.
    fn root_exists(&self) -> Result<bool, StoreError>;

    /// Whether an artifact named `name` exists.
    fn exists(&self, name: &ArtifactName) -> Result<bool, StoreError>;

    /// Write `bytes` under `name`, replacing any existing artifact of that name.
    ///
    /// On error no artifact named `name` has been created or altered.
    fn write(&self, name: &ArtifactName, bytes: &[u8]) -> Result<(), StoreError>;

    /// Remove `name`. Returns `false` if it was already absent.
    fn remove(&self, name: &ArtifactName) -> Result<bool, StoreError>;
}

// -- Filesystem ---------------------------------------------------------------

/// Artifacts stored as files in one directory.
///
/// The directory does not need to exist yet; it is created by
/// [`ensure_root`](ArtifactStorage::ensure_root).
#[derive(Debug, Clone)]
pub struct FsArtifactStorage {
    root: PathBuf,
}

impl FsArtifactStorage {
    /// Create storage rooted at `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Return the storage directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path where `name` is (or would be) stored.
    pub fn path_of(&self, name: &ArtifactName) -> PathBuf {
        self.root.join(name.as_str())
    }

    fn partial_path(&self, name: &ArtifactName) -> PathBuf {
        self.root.join(format!(".{name}.partial"))
    }

    /// A fresh dot-prefixed path in the storage directory for streaming an
    /// upload whose bytes arrive before they are committed.
    pub fn staging_path(&self) -> PathBuf {
        static NEXT: AtomicU64 = AtomicU64::new(0);
        let n = NEXT.fetch_add(1, Ordering::Relaxed);
        self.root
            .join(format!(".upload-{}-{n}.partial", std::process::id()))
    }

    /// Rename a fully written file from [`staging_path`](Self::staging_path)
    /// over `name`. The staged file must live in this storage directory.
    pub fn adopt(&self, name: &ArtifactName, staged: &Path) -> Result<(), StoreError> {
        let target = self.path_of(name);
        fs::rename(staged, &target).map_err(|e| StoreError::io("store staged artifact", target, e))
    }
}

impl ArtifactStorage for FsArtifactStorage {
    fn ensure_root(&self) -> Result<(), StoreError> {
        fs::create_dir_all(&self.root).map_err(|e| StoreError::io("create uploads dir", &self.root, e))
    }

    fn root_exists(&self) -> Result<bool, StoreError> {
        match fs::metadata(&self.root) {
            Ok(meta) => Ok(meta.is_dir()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(StoreError::io("stat uploads dir", &self.root, e)),
        }
    }

    fn exists(&self, name: &ArtifactName) -> Result<bool, StoreError> {
        let path = self.path_of(name);
        match fs::metadata(&path) {
            Ok(meta) => Ok(meta.is_file()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(StoreError::io("stat artifact", path, e)),
        }
    }

    fn write(&self, name: &ArtifactName, bytes: &[u8]) -> Result<(), StoreError> {
        let target = self.path_of(name);
        let partial = self.partial_path(name);
        let result = (|| -> std::io::Result<()> {
            let mut f = fs::File::create(&partial)?;
            f.write_all(bytes)?;
            f.sync_all()?;
            fs::rename(&partial, &target)
        })();
        if let Err(e) = result {
            let _ = fs::remove_file(&partial);
            return Err(StoreError::io("write artifact", target, e));
        }
        Ok(())
    }

    fn remove(&self, name: &ArtifactName) -> Result<bool, StoreError> {
        let path = self.path_of(name);
        match fs::remove_file(&path) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(StoreError::io("remove artifact", path, e)),
        }
    }
}

// -- In-memory ----------------------------------------------------------------

/// Artifacts held in a map. Useful for embedding the slot where no disk is
/// available and for exercising fault paths: writes can be made to fail.
#[derive(Debug, Default)]
pub struct MemoryArtifactStorage {
    root_created: RwLock<bool>,
    files: RwLock<HashMap<ArtifactName, Vec<u8>>>,
    fail_writes: RwLock<bool>,
}

impl MemoryArtifactStorage {
    /// Create empty storage whose root does not exist yet.
    pub fn new() -> Self {
        Self::default()
    }

    /// Make subsequent writes fail (or succeed again).
    pub fn set_fail_writes(&self, fail: bool) {
        *self.fail_writes.write() = fail;
    }

    /// Bytes stored under `name`, if any.
    pub fn get(&self, name: &ArtifactName) -> Option<Vec<u8>> {
        self.files.read().get(name).cloned()
    }

    /// Remove `name` without going through the slot, simulating out-of-band deletion.
    pub fn evict(&self, name: &ArtifactName) -> Option<Vec<u8>> {
        self.files.write().remove(name)
    }

    /// Names of all stored artifacts, sorted.
    pub fn names(&self) -> Vec<ArtifactName> {
        let mut names: Vec<_> = self.files.read().keys().cloned().collect();
        names.sort();
        names
    }
}

impl ArtifactStorage for MemoryArtifactStorage {
    fn ensure_root(&self) -> Result<(), StoreError> {
        *self.root_created.write() = true;
        Ok(())
    }

    fn root_exists(&self) -> Result<bool, StoreError> {
        Ok(*self.root_created.read())
    }

    fn exists(&self, name: &ArtifactName) -> Result<bool, StoreError> {
        Ok(self.files.read().contains_key(name))
    }

    fn write(&self, name: &ArtifactName, bytes: &[u8]) -> Result<(), StoreError> {
        if *self.fail_writes.read() {
            return Err(StoreError::io(
                "write artifact",
                name.as_str(),
                std::io::Error::new(std::io::ErrorKind::Other, "injected write failure"),
            ));
        }
        self.files.write().insert(name.clone(), bytes.to_vec());
        Ok(())
    }

    fn remove(&self, name: &ArtifactName) -> Result<bool, StoreError> {
        Ok(self.files.write().remove(name).is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn name(s: &str) -> ArtifactName {
        ArtifactName::new(s).unwrap()
    }

    #[test]
    fn fs_root_is_created_lazily() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FsArtifactStorage::new(dir.path().join("public/uploads"));
        assert!(!storage.root_exists().unwrap());
        storage.ensure_root().unwrap();
        assert!(storage.root_exists().unwrap());
        // Idempotent.
        storage.ensure_root().unwrap();
    }

    #[test]
    fn fs_write_exists_remove() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FsArtifactStorage::new(dir.path());
        let n = name("game.zip");

        assert!(!storage.exists(&n).unwrap());
        storage.write(&n, b"PK\x03\x04payload").unwrap();
        assert!(storage.exists(&n).unwrap());
        assert_eq!(fs::read(storage.path_of(&n)).unwrap(), b"PK\x03\x04payload");

        assert!(storage.remove(&n).unwrap());
        assert!(!storage.exists(&n).unwrap());
        assert!(!storage.remove(&n).unwrap(), "second remove reports absent");
    }

    #[test]
    fn fs_write_overwrites_same_name() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FsArtifactStorage::new(dir.path());
        let n = name("game.zip");
        storage.write(&n, b"first").unwrap();
        storage.write(&n, b"second").unwrap();
        assert_eq!(fs::read(storage.path_of(&n)).unwrap(), b"second");
    }

    #[test]
    fn fs_write_into_missing_root_fails_without_residue() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FsArtifactStorage::new(dir.path().join("absent"));
        let n = name("game.zip");
        let err = storage.write(&n, b"bytes").unwrap_err();
        assert!(matches!(err, StoreError::Io { op: "write artifact", .. }));
        assert!(!storage.exists(&n).unwrap());
    }

    #[test]
    fn fs_write_leaves_no_partial_file() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FsArtifactStorage::new(dir.path());
        storage.write(&name("game.zip"), b"bytes").unwrap();
        let names: Vec<_> = fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["game.zip".to_string()]);
    }

    #[test]
    fn staging_paths_are_unique_and_hidden() {
        let storage = FsArtifactStorage::new("/srv/uploads");
        let a = storage.staging_path();
        let b = storage.staging_path();
        assert_ne!(a, b);
        for p in [&a, &b] {
            assert_eq!(p.parent(), Some(Path::new("/srv/uploads")));
            let file = p.file_name().unwrap().to_string_lossy();
            assert!(file.starts_with('.') && file.ends_with(".partial"), "{file}");
        }
    }

    #[test]
    fn fs_adopt_moves_staged_file_into_place() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FsArtifactStorage::new(dir.path());
        let staged = storage.staging_path();
        fs::write(&staged, b"PK\x03\x04staged").unwrap();

        storage.adopt(&name("game.zip"), &staged).unwrap();
        assert!(!staged.exists());
        assert_eq!(fs::read(storage.path_of(&name("game.zip"))).unwrap(), b"PK\x03\x04staged");
    }

    #[test]
    fn fs_directory_with_artifact_name_is_not_an_artifact() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("trap.zip")).unwrap();
        let storage = FsArtifactStorage::new(dir.path());
        assert!(!storage.exists(&name("trap.zip")).unwrap());
    }

    #[test]
    fn memory_storage_injected_failure() {
        let storage = MemoryArtifactStorage::new();
        storage.ensure_root().unwrap();
        storage.set_fail_writes(true);
        assert!(storage.write(&name("a.zip"), b"x").is_err());
        assert!(storage.names().is_empty());

        storage.set_fail_writes(false);
        storage.write(&name("a.zip"), b"x").unwrap();
        assert_eq!(storage.get(&name("a.zip")), Some(b"x".to_vec()));
    }
}
