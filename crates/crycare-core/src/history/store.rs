use crate::{
    CaptureError, CoreResult,
    audio::remove_recording_file,
    history::HistoryRecord,
    submission::{HistoryMirror, MirrorDeletion, RemoteHistoryEntry},
};

use std::{
    io::ErrorKind,
    panic::Location,
    path::{Path, PathBuf},
    sync::Arc,
};

use error_location::ErrorLocation;
use tokio::sync::Mutex;
use tracing::{debug, info, instrument, warn};

/// Most records kept in the local log.
pub const HISTORY_LIMIT: usize = 50;

/// Bounded, most-recent-first log of completed classifications.
///
/// Stored as a JSON array. Writes go through a temp file and a rename so a
/// crash never leaves a half-written log behind. An optional remote mirror
/// is consulted for deletes and remote listings.
pub struct HistoryStore {
    path: PathBuf,
    mirror: Option<Arc<dyn HistoryMirror>>,
    /// Serializes read-modify-write cycles.
    write_lock: Mutex<()>,
}

impl HistoryStore {
    /// Local-only store backed by `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            mirror: None,
            write_lock: Mutex::new(()),
        }
    }

    /// Attach a remote mirror.
    pub fn with_mirror(mut self, mirror: Arc<dyn HistoryMirror>) -> Self {
        self.mirror = Some(mirror);
        self
    }

    /// Location of the log file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// All records, most recent first. A missing log reads as empty.
    #[instrument(skip(self))]
    pub async fn list(&self) -> CoreResult<Vec<HistoryRecord>> {
        self.load().await
    }

    /// Prepend a record, keeping at most [`HISTORY_LIMIT`].
    ///
    /// Recordings of evicted records are deleted once the log is saved.
    #[instrument(skip(self, record), fields(id = %record.id))]
    pub async fn append(&self, record: HistoryRecord) -> CoreResult<()> {
        let _guard = self.write_lock.lock().await;

        let mut records = self.load().await?;
        records.insert(0, record);
        let evicted = records.split_off(records.len().min(HISTORY_LIMIT));
        self.save(&records).await?;

        for old in &evicted {
            remove_recording_file(&old.recording_uri).await;
        }

        debug!(count = records.len(), evicted = evicted.len(), "History record appended");
        Ok(())
    }

    /// Delete a record remotely, then locally.
    ///
    /// A remote "not found" counts as success. Any other remote failure is
    /// returned and the local log is left untouched.
    #[instrument(skip(self))]
    pub async fn delete(&self, id: &str) -> CoreResult<()> {
        if let Some(mirror) = &self.mirror {
            match mirror.delete(id).await? {
                MirrorDeletion::Deleted => debug!(id, "Deleted from remote history"),
                MirrorDeletion::AlreadyAbsent => {
                    debug!(id, "Remote history had no such entry, removing locally")
                }
            }
        }

        let _guard = self.write_lock.lock().await;

        let mut records = self.load().await?;
        let Some(index) = records.iter().position(|r| r.id == id) else {
            debug!(id, "No local history record with this id");
            return Ok(());
        };
        let removed = records.remove(index);
        self.save(&records).await?;
        remove_recording_file(&removed.recording_uri).await;

        info!(id, "History record deleted");
        Ok(())
    }

    /// Remove the local log entirely, along with the recordings it lists.
    #[instrument(skip(self))]
    pub async fn clear(&self) -> CoreResult<()> {
        let _guard = self.write_lock.lock().await;

        // An unreadable log is still cleared; only its recordings are kept.
        let records = self.load().await.unwrap_or_else(|e| {
            warn!(error = ?e, "Clearing unreadable history, recordings are kept");
            Vec::new()
        });

        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(()),
            Err(e) => {
                return Err(storage_error(format!(
                    "Failed to remove {:?}: {}",
                    self.path, e
                )));
            }
        }

        for record in &records {
            remove_recording_file(&record.recording_uri).await;
        }

        info!(count = records.len(), "History cleared");
        Ok(())
    }

    /// Remote history, newest first. Empty without a mirror.
    #[instrument(skip(self))]
    pub async fn remote_entries(&self) -> CoreResult<Vec<RemoteHistoryEntry>> {
        let Some(mirror) = &self.mirror else {
            return Ok(Vec::new());
        };

        let mut entries = mirror.fetch_history().await?;
        // Entries without a readable timestamp sort last.
        entries.sort_by_key(|entry| std::cmp::Reverse(entry.parsed_timestamp()));
        Ok(entries)
    }

    async fn load(&self) -> CoreResult<Vec<HistoryRecord>> {
        let contents = match tokio::fs::read_to_string(&self.path).await {
            Ok(contents) => contents,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => {
                return Err(storage_error(format!(
                    "Failed to read {:?}: {}",
                    self.path, e
                )));
            }
        };

        if contents.trim().is_empty() {
            return Ok(Vec::new());
        }

        serde_json::from_str(&contents).map_err(|e| {
            warn!(path = ?self.path, error = %e, "History log is unreadable");
            storage_error(format!("Failed to parse {:?}: {}", self.path, e))
        })
    }

    async fn save(&self, records: &[HistoryRecord]) -> CoreResult<()> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(|e| {
                storage_error(format!("Failed to create directory {:?}: {}", parent, e))
            })?;
        }

        let json = serde_json::to_string_pretty(records)
            .map_err(|e| storage_error(format!("Failed to serialize history: {}", e)))?;

        let temp_path = self.path.with_extension("json.tmp");
        tokio::fs::write(&temp_path, json)
            .await
            .map_err(|e| storage_error(format!("Failed to write {:?}: {}", temp_path, e)))?;
        tokio::fs::rename(&temp_path, &self.path)
            .await
            .map_err(|e| storage_error(format!("Failed to replace {:?}: {}", self.path, e)))?;

        Ok(())
    }
}

#[track_caller]
fn storage_error(reason: String) -> CaptureError {
    CaptureError::StorageError {
        reason,
        location: ErrorLocation::from(Location::caller()),
    }
}
