//! Pointer record persistence.
//!
//! [`PointerStore`] is the get/set/clear interface over the single named
//! record that says which artifact is current. Handlers never touch the
//! sidecar path directly.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use depot_core::{ArtifactName, PointerRecord, POINTER_FILE_NAME};
use parking_lot::RwLock;

use crate::error::StoreError;

/// Durable storage for the current-build pointer record.
///
/// Implementations only need [`load`](PointerStore::load) and
/// [`save`](PointerStore::save); the helpers are derived from them.
pub trait PointerStore: Send + Sync {
    /// Read the record. `Ok(None)` means no record has been written yet.
    fn load(&self) -> Result<Option<PointerRecord>, StoreError>;

    /// Replace the record.
    fn save(&self, record: &PointerRecord) -> Result<(), StoreError>;

    /// The current artifact name, treating an absent record as empty.
    fn get(&self) -> Result<Option<ArtifactName>, StoreError> {
        Ok(self.load()?.and_then(|r| r.current_file))
    }

    /// Point at `name`, unconditionally replacing the previous value.
    fn set(&self, name: &ArtifactName) -> Result<(), StoreError> {
        self.save(&PointerRecord::pointing_at(name.clone()))
    }

    /// Reset the pointer to null.
    fn clear(&self) -> Result<(), StoreError> {
        self.save(&PointerRecord::empty())
    }
}

// -- Sidecar file -------------------------------------------------------------

/// Pointer record kept as a JSON file, by default `metadata.json` in the
/// uploads directory.
///
/// Writes go to a dot-prefixed temp file first and are renamed into place,
/// so a crash mid-write never leaves a truncated record.
#[derive(Debug, Clone)]
pub struct JsonPointerStore {
    path: PathBuf,
}

impl JsonPointerStore {
    /// Store the record at an explicit path.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Store the record as [`POINTER_FILE_NAME`] inside `dir`.
    pub fn in_dir(dir: impl AsRef<Path>) -> Self {
        Self::new(dir.as_ref().join(POINTER_FILE_NAME))
    }

    /// Location of the record.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let file_name = self
            .path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| POINTER_FILE_NAME.to_string());
        self.path.with_file_name(format!(".{file_name}.tmp"))
    }
}

impl PointerStore for JsonPointerStore {
    fn load(&self) -> Result<Option<PointerRecord>, StoreError> {
        let bytes = match fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(StoreError::io("read pointer", &self.path, e)),
        };
        serde_json::from_slice(&bytes)
            .map(Some)
            .map_err(|source| StoreError::CorruptPointer {
                path: self.path.clone(),
                source,
            })
    }

    fn save(&self, record: &PointerRecord) -> Result<(), StoreError> {
        let bytes = serde_json::to_vec(record).map_err(|source| StoreError::CorruptPointer {
            path: self.path.clone(),
            source,
        })?;
        let tmp = self.temp_path();
        let result = (|| -> std::io::Result<()> {
            let mut f = fs::File::create(&tmp)?;
            f.write_all(&bytes)?;
            f.sync_all()?;
            fs::rename(&tmp, &self.path)
        })();
        if let Err(e) = result {
            let _ = fs::remove_file(&tmp);
            return Err(StoreError::io("write pointer", &self.path, e));
        }
        Ok(())
    }
}

// -- In-memory ----------------------------------------------------------------

/// Pointer record held in process memory. Starts absent.
#[derive(Debug, Default)]
pub struct MemoryPointerStore {
    record: RwLock<Option<PointerRecord>>,
}

impl MemoryPointerStore {
    /// Create a store with no record.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store already holding `record`.
    pub fn with_record(record: PointerRecord) -> Self {
        Self {
            record: RwLock::new(Some(record)),
        }
    }
}

impl PointerStore for MemoryPointerStore {
    fn load(&self) -> Result<Option<PointerRecord>, StoreError> {
        Ok(self.record.read().clone())
    }

    fn save(&self, record: &PointerRecord) -> Result<(), StoreError> {
        *self.record.write() = Some(record.clone());
        Ok(())
    }
}
