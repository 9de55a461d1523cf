//! File-system backed checkpoint store.
//!
//! Layout:
//! ```text
//! {base_dir}/sessions/{session_id}.json
//! ```
//!
//! Each file is one JSON-serialized [`Checkpoint`]. Writes go through a
//! temp-file-then-rename so a crash mid-write never leaves a torn snapshot.

use std::io::Write as _;
use std::path::PathBuf;

use async_trait::async_trait;

use super::{Checkpoint, CheckpointStore};
use crate::errors::CheckpointError;

/// Durable checkpoint store rooted at a base directory.
pub struct FileCheckpointStore {
    base_dir: PathBuf,
}

impl FileCheckpointStore {
    /// Create a new store rooted at `base_dir`. Creates
    /// `{base_dir}/sessions/` if it doesn't exist.
    pub fn new(base_dir: PathBuf) -> Result<Self, CheckpointError> {
        let sessions_dir = base_dir.join("sessions");
        std::fs::create_dir_all(&sessions_dir).map_err(|e| CheckpointError::Store {
            message: format!("failed to create sessions directory: {e}"),
        })?;
        Ok(Self { base_dir })
    }

    fn session_path(&self, session_id: &str) -> Result<PathBuf, CheckpointError> {
        validate_session_id(session_id)?;
        Ok(self
            .base_dir
            .join("sessions")
            .join(format!("{session_id}.json")))
    }
}

/// Session identifiers become file names; reject anything that could walk
/// out of the sessions directory.
fn validate_session_id(session_id: &str) -> Result<(), CheckpointError> {
    let ok = !session_id.is_empty()
        && session_id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '.')
        && !session_id.contains("..");
    if ok {
        Ok(())
    } else {
        Err(CheckpointError::Store {
            message: format!("invalid session id: {session_id:?}"),
        })
    }
}

#[async_trait]
impl CheckpointStore for FileCheckpointStore {
    async fn put(&self, checkpoint: &Checkpoint) -> Result<(), CheckpointError> {
        let path = self.session_path(&checkpoint.session_id)?;
        let json =
            serde_json::to_vec_pretty(checkpoint).map_err(|e| CheckpointError::Store {
                message: format!("failed to serialize checkpoint: {e}"),
            })?;

        let temp_path = path.with_extension("json.tmp");
        {
            let mut file =
                std::fs::File::create(&temp_path).map_err(|e| CheckpointError::Store {
                    message: format!("failed to create temp file: {e}"),
                })?;
            file.write_all(&json).map_err(|e| CheckpointError::Store {
                message: format!("failed to write checkpoint: {e}"),
            })?;
            file.sync_all().map_err(|e| CheckpointError::Store {
                message: format!("failed to sync checkpoint: {e}"),
            })?;
        }
        std::fs::rename(&temp_path, &path).map_err(|e| CheckpointError::Store {
            message: format!("failed to commit checkpoint: {e}"),
        })?;

        tracing::debug!(session_id = %checkpoint.session_id, status = ?checkpoint.status, "checkpoint written");
        Ok(())
    }

    async fn get(&self, session_id: &str) -> Result<Option<Checkpoint>, CheckpointError> {
        let path = self.session_path(session_id)?;
        if !path.exists() {
            return Ok(None);
        }
        let content = std::fs::read_to_string(&path).map_err(|e| CheckpointError::Store {
            message: format!("failed to read checkpoint: {e}"),
        })?;
        let checkpoint =
            serde_json::from_str(&content).map_err(|e| CheckpointError::Store {
                message: format!("failed to deserialize checkpoint: {e}"),
            })?;
        Ok(Some(checkpoint))
    }

    async fn delete(&self, session_id: &str) -> Result<bool, CheckpointError> {
        let path = self.session_path(session_id)?;
        if !path.exists() {
            return Ok(false);
        }
        std::fs::remove_file(&path).map_err(|e| CheckpointError::Store {
            message: format!("failed to delete checkpoint: {e}"),
        })?;
        Ok(true)
    }
}
