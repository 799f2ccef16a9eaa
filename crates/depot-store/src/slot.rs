//! The build slot: query, upload/replace, and delete over one pointer
//! record and one artifact storage.
//!
//! ## Concurrency
//!
//! All three operations take the slot's mutex for their full duration, so
//! within one process they are serialized. The mutex is `parking_lot` and
//! guards synchronous I/O only; async callers run slot operations on a
//! blocking thread. Separate processes sharing a directory are not
//! coordinated.

use std::path::{Path, PathBuf};

use depot_core::{ArtifactName, PointerRecord, SlotState, ValidationError};
use parking_lot::Mutex;

use crate::error::StoreError;
use crate::pointer::PointerStore;
use crate::storage::{ArtifactStorage, FsArtifactStorage};

/// What happens to the previously current artifact when a new one is uploaded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ReplacePolicy {
    /// Remove the previous artifact's bytes once the pointer has moved.
    #[default]
    DeletePrevious,
    /// Keep previous artifacts on disk; only the pointer changes.
    RetainPrevious,
}

/// Result of a successful upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadReceipt {
    /// The stored (now current) artifact.
    pub file_name: ArtifactName,
    /// Size of the stored payload.
    pub bytes_written: u64,
    /// The artifact that was current before this upload, if different.
    pub replaced: Option<ArtifactName>,
    /// Whether the replaced artifact's bytes were removed.
    pub removed_previous: bool,
}

/// Result of a successful delete.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeleteOutcome {
    /// The current artifact was removed and the pointer cleared.
    Deleted(ArtifactName),
    /// The pointer named an artifact that was already gone; the pointer was cleared.
    AlreadyMissing(ArtifactName),
    /// No storage, no record, or a null pointer: nothing changed.
    NothingToDelete,
}

impl DeleteOutcome {
    /// Human-readable summary returned to API callers.
    pub fn message(&self) -> String {
        match self {
            Self::Deleted(_) => "File deleted successfully".to_string(),
            Self::AlreadyMissing(name) => {
                format!("File {name} was already missing; current build cleared")
            }
            Self::NothingToDelete => "No file to delete".to_string(),
        }
    }
}

/// One current-build slot.
#[derive(Debug)]
pub struct BuildSlot<P, A> {
    pointer: P,
    storage: A,
    policy: ReplacePolicy,
    lock: Mutex<()>,
}

impl<P: PointerStore, A: ArtifactStorage> BuildSlot<P, A> {
    /// Compose a slot from a pointer store and artifact storage.
    pub fn new(pointer: P, storage: A) -> Self {
        Self {
            pointer,
            storage,
            policy: ReplacePolicy::default(),
            lock: Mutex::new(()),
        }
    }

    /// Set the replace policy.
    pub fn with_policy(mut self, policy: ReplacePolicy) -> Self {
        self.policy = policy;
        self
    }

    /// The active replace policy.
    pub fn policy(&self) -> ReplacePolicy {
        self.policy
    }

    /// Access the pointer store.
    pub fn pointer(&self) -> &P {
        &self.pointer
    }

    /// Access the artifact storage.
    pub fn storage(&self) -> &A {
        &self.storage
    }

    /// Query the current artifact name.
    ///
    /// Creates the storage location and a null pointer record if either is
    /// absent. A pointer naming a missing artifact is reset to null and the
    /// reset persisted before returning `None`.
    pub fn current(&self) -> Result<Option<ArtifactName>, StoreError> {
        let _guard = self.lock.lock();
        self.current_locked()
    }

    fn current_locked(&self) -> Result<Option<ArtifactName>, StoreError> {
        self.storage.ensure_root()?;

        let Some(record) = self.pointer.load()? else {
            self.pointer.save(&PointerRecord::empty())?;
            tracing::debug!("created empty pointer record");
            return Ok(None);
        };

        let Some(name) = record.current_file else {
            return Ok(None);
        };
        // A stat fault propagates; only a confirmed absence heals the pointer.
        if self.storage.exists(&name)? {
            return Ok(Some(name));
        }
        tracing::warn!(file_name = %name, "current build missing from storage, clearing pointer");
        self.pointer.clear()?;
        Ok(None)
    }

    /// Inspect the slot without creating or healing anything.
    pub fn state(&self) -> Result<SlotState, StoreError> {
        let _guard = self.lock.lock();
        if !self.storage.root_exists()? {
            return Ok(SlotState::Empty);
        }
        let record = self.pointer.load()?.unwrap_or_default();
        let exists = match &record.current_file {
            Some(name) => self.storage.exists(name)?,
            None => false,
        };
        Ok(SlotState::classify(&record, |_| exists))
    }

    /// Store `bytes` as `declared_name` and make it current.
    ///
    /// The name is validated before anything is touched. The pointer only
    /// moves once the bytes are fully written, so a failed write leaves the
    /// previous current build in place.
    pub fn upload(&self, declared_name: &str, bytes: &[u8]) -> Result<UploadReceipt, StoreError> {
        let name = ArtifactName::new(declared_name)?;
        if bytes.is_empty() {
            return Err(ValidationError::MissingFile.into());
        }

        let _guard = self.lock.lock();
        self.commit_locked(name, bytes.len() as u64, |storage, name| storage.write(name, bytes))
    }

    /// Store the new artifact with `store`, then move the pointer and apply
    /// the replace policy. Callers hold the slot lock.
    fn commit_locked(
        &self,
        name: ArtifactName,
        size: u64,
        store: impl FnOnce(&A, &ArtifactName) -> Result<(), StoreError>,
    ) -> Result<UploadReceipt, StoreError> {
        self.storage.ensure_root()?;

        let previous = match self.pointer.get() {
            Ok(previous) => previous,
            Err(StoreError::CorruptPointer { path, source }) => {
                tracing::warn!(path = %path.display(), error = %source, "overwriting corrupt pointer record");
                None
            }
            Err(e) => return Err(e),
        };

        store(&self.storage, &name)?;
        self.pointer.set(&name)?;
        tracing::info!(file_name = %name, bytes = size, "uploaded build");

        let replaced = previous.filter(|p| *p != name);
        let removed_previous = match (&replaced, self.policy) {
            (Some(old), ReplacePolicy::DeletePrevious) => match self.storage.remove(old) {
                Ok(removed) => removed,
                Err(e) => {
                    tracing::warn!(file_name = %old, error = %e, "failed to remove replaced build");
                    false
                }
            },
            _ => false,
        };

        Ok(UploadReceipt {
            file_name: name,
            bytes_written: size,
            replaced,
            removed_previous,
        })
    }

    /// Delete the current artifact, resolved through the pointer.
    ///
    /// Succeeds without changes when there is nothing to delete. A pointer
    /// naming an already-missing artifact is still cleared.
    pub fn delete_current(&self) -> Result<DeleteOutcome, StoreError> {
        let _guard = self.lock.lock();

        if !self.storage.root_exists()? {
            return Ok(DeleteOutcome::NothingToDelete);
        }
        let Some(name) = self.pointer.get()? else {
            return Ok(DeleteOutcome::NothingToDelete);
        };

        let removed = self.storage.remove(&name)?;
        self.pointer.clear()?;

        if removed {
            tracing::info!(file_name = %name, "deleted current build");
            Ok(DeleteOutcome::Deleted(name))
        } else {
            tracing::warn!(file_name = %name, "current build was already missing, pointer cleared");
            Ok(DeleteOutcome::AlreadyMissing(name))
        }
    }
}

impl<P: PointerStore> BuildSlot<P, FsArtifactStorage> {
    /// Query the current artifact and return its on-disk path.
    pub fn current_path(&self) -> Result<Option<(ArtifactName, PathBuf)>, StoreError> {
        let _guard = self.lock.lock();
        Ok(self.current_locked()?.map(|name| {
            let path = self.storage.path_of(&name);
            (name, path)
        }))
    }

    /// Reserve a staging path for an upload streamed to disk.
    ///
    /// Creates the storage directory so the caller can open the file
    /// straight away. Pass the path to [`upload_staged`](Self::upload_staged)
    /// once every byte is written and synced.
    pub fn staging_path(&self) -> Result<PathBuf, StoreError> {
        self.storage.ensure_root()?;
        Ok(self.storage.staging_path())
    }

    /// Make a staged file the current build under `declared_name`.
    ///
    /// Same contract as [`upload`](BuildSlot::upload), except the bytes are
    /// renamed into place rather than copied. The staged file is consumed:
    /// on any error it is removed.
    pub fn upload_staged(&self, declared_name: &str, staged: &Path) -> Result<UploadReceipt, StoreError> {
        let result = self.commit_staged(declared_name, staged);
        if result.is_err() {
            if let Err(e) = std::fs::remove_file(staged) {
                if e.kind() != std::io::ErrorKind::NotFound {
                    tracing::warn!(path = %staged.display(), error = %e, "failed to remove staged upload");
                }
            }
        }
        result
    }

    fn commit_staged(&self, declared_name: &str, staged: &Path) -> Result<UploadReceipt, StoreError> {
        let name = ArtifactName::new(declared_name)?;
        let size = std::fs::metadata(staged)
            .map_err(|e| StoreError::io("stat staged upload", staged, e))?
            .len();
        if size == 0 {
            return Err(ValidationError::MissingFile.into());
        }

        let _guard = self.lock.lock();
        self.commit_locked(name, size, |storage, name| storage.adopt(name, staged))
    }
}
