//! Watermark persistence for the indexing pipeline.
//!
//! The checkpoint is a single JSON file of the form
//! `{"last_seen_id": 1234}`. A missing or unreadable file is treated
//! as "no watermark" so a fresh or damaged deployment reprocesses from
//! the start rather than refusing to run; upserts are keyed by
//! listing id, so reprocessing is safe.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::Result;

#[derive(Debug, Serialize, Deserialize)]
struct CheckpointState {
    last_seen_id: i64,
}

/// File-backed watermark store.
#[derive(Debug, Clone)]
pub struct CheckpointFile {
    path: PathBuf,
}

impl CheckpointFile {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the persisted watermark.
    ///
    /// Returns `None` when the file does not exist or cannot be
    /// parsed. Corruption is logged but deliberately non-fatal: the
    /// pipeline restarts from the beginning.
    #[must_use]
    pub fn load(&self) -> Option<i64> {
        let contents = match fs::read_to_string(&self.path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return None,
            Err(e) => {
                log::warn!(
                    "Could not read checkpoint {}: {e}; starting from the beginning",
                    self.path.display()
                );
                return None;
            }
        };

        match serde_json::from_str::<CheckpointState>(&contents) {
            Ok(state) => Some(state.last_seen_id),
            Err(e) => {
                log::warn!(
                    "Checkpoint {} is malformed: {e}; starting from the beginning",
                    self.path.display()
                );
                None
            }
        }
    }

    /// Atomically persist a new watermark.
    ///
    /// The new value is written to a sibling temp file and renamed
    /// into place, so a crash mid-write leaves the previous watermark
    /// intact. A failure here after a successful batch is fatal for
    /// the run: the external side effects have already landed and the
    /// next run will reprocess the same page.
    pub fn save(&self, last_seen_id: i64) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let state = CheckpointState { last_seen_id };
        let tmp = self.path.with_extension("tmp");
        fs::write(&tmp, serde_json::to_string(&state)?)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}
