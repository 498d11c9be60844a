//! Durable persistence for the exam session record.
//!
//! One JSON file holds the single attempt's state. Writes go through a temp
//! file in the same directory followed by a rename, so a reader never sees a
//! partially written record. A missing or corrupt record is treated as "no
//! prior session", never as a fatal error.

use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::session::state::ExamSession;

#[derive(Debug, Clone)]
pub struct SessionStore {
    path: PathBuf,
}

impl SessionStore {
    /// Store backed by `<data_dir>/session.json`. Creates the directory if
    /// needed.
    pub fn open(data_dir: impl AsRef<Path>) -> Result<Self> {
        let data_dir = data_dir.as_ref();
        fs::create_dir_all(data_dir).context("Failed to create session data directory")?;

        Ok(Self {
            path: data_dir.join("session.json"),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the persisted session, if a valid one exists.
    pub fn load(&self) -> Result<Option<ExamSession>> {
        let bytes = match fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e).context("Failed to read session record"),
        };

        match serde_json::from_slice::<ExamSession>(&bytes) {
            Ok(session) => {
                info!(
                    "Loaded saved session for {} ({} phase, {}s remaining)",
                    session.candidate_id,
                    session.phase.label(),
                    session.time_remaining_secs
                );
                Ok(Some(session))
            }
            Err(e) => {
                warn!("Discarding corrupt session record: {}", e);
                Ok(None)
            }
        }
    }

    /// Overwrite the durable record. Atomic from a subsequent `load`'s
    /// perspective: the JSON is written to a sibling temp file and renamed
    /// into place.
    pub fn save(&self, session: &ExamSession) -> Result<()> {
        let json =
            serde_json::to_vec_pretty(session).context("Failed to serialize session record")?;

        let tmp_path = self.path.with_extension("json.tmp");
        fs::write(&tmp_path, &json)
            .with_context(|| format!("Failed to write temp session file: {:?}", tmp_path))?;
        fs::rename(&tmp_path, &self.path).context("Failed to replace session record")?;

        Ok(())
    }

    /// Remove the durable record. Idempotent.
    pub fn clear(&self) -> Result<()> {
        match fs::remove_file(&self.path) {
            Ok(()) => {
                info!("Cleared session record");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e).context("Failed to clear session record"),
        }
    }
}
