//! File-backed counter store.
//!
//! The counter lives in a small JSON document (`{"value":..,"revision":..}`)
//! at a fixed path. Writes are serialized by an in-process [`Mutex`] and
//! made crash-safe with the temp-file pattern:
//!
//! 1. Write the new document to `<path>.tmp`
//! 2. `sync_all()` the temp file
//! 3. Rename it over the final path (atomic on POSIX filesystems)
//!
//! The cached state is only replaced after the rename succeeds, so a failed
//! write leaves both the file and the in-memory copy at the old value.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

use crate::change::StateChange;
use crate::error::StoreError;

/// A counter persisted to a single JSON file.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    state: Mutex<StateChange>,
}

impl FileStore {
    /// Open the counter file at `path`, creating it with value `0` if it
    /// does not exist yet.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Io`] if the file cannot be read or created.
    /// Returns [`StoreError::Serialization`] if the file holds something
    /// other than a counter document.
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        let state = match tokio::fs::read_to_string(&path).await {
            Ok(contents) => serde_json::from_str::<StateChange>(&contents)?,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                let initial = StateChange::default();
                write_atomic(&path, &initial).await?;
                tracing::info!(path = %path.display(), "Initialized counter file");
                initial
            }
            Err(e) => return Err(e.into()),
        };

        tracing::info!(
            path = %path.display(),
            value = state.value,
            revision = state.revision,
            "Opened counter file"
        );

        Ok(Self {
            path,
            state: Mutex::new(state),
        })
    }

    /// Read the current state.
    pub async fn read(&self) -> Result<StateChange, StoreError> {
        Ok(*self.state.lock().await)
    }

    /// Add `delta`, persist, and return the committed state.
    pub async fn apply_delta(&self, delta: i64) -> Result<StateChange, StoreError> {
        let mut state = self.state.lock().await;
        let next = state.apply(delta)?;
        write_atomic(&self.path, &next).await?;
        *state = next;
        Ok(next)
    }

    /// Force the value to zero and persist.
    pub async fn reset(&self) -> Result<StateChange, StoreError> {
        let mut state = self.state.lock().await;
        let next = state.zeroed()?;
        write_atomic(&self.path, &next).await?;
        *state = next;
        Ok(next)
    }
}

/// Replace the document at `path` with `state` via temp file + rename.
async fn write_atomic(path: &Path, state: &StateChange) -> Result<(), StoreError> {
    let json = serde_json::to_vec(state)?;
    let temp_path = path.with_extension("tmp");

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await?;
    }

    let mut file = tokio::fs::File::create(&temp_path).await?;
    file.write_all(&json).await?;
    file.sync_all().await?;
    drop(file);

    tokio::fs::rename(&temp_path, path).await?;
    Ok(())
}
