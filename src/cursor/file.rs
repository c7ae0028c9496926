//! File-backed cursor store
//!
//! One JSON document per (event type, partition) under a configured
//! directory. Writes go to a temp file in the same directory followed by a
//! rename, so a crash mid-commit leaves the previous cursor intact.

use super::CursorStore;
use crate::error::{EventlineError, Result};
use crate::model::{Cursor, EventType, EventTypeCursor, PartitionId};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Cursor document persisted on disk.
///
/// Event type and partition are stored redundantly so a document can be
/// validated against the key it was read for.
#[derive(Debug, Serialize, Deserialize)]
struct StoredCursor {
    event_type: EventType,
    partition: PartitionId,
    cursor: Cursor,
    committed_at: DateTime<Utc>,
}

/// Cursor store keeping one JSON file per partition in a directory.
pub struct FileCursorStore {
    dir: PathBuf,
}

impl FileCursorStore {
    /// Create a store rooted at `dir`, creating the directory if needed.
    pub async fn new(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|e| EventlineError::Storage(format!("creating {}: {e}", dir.display())))?;
        Ok(Self { dir })
    }

    fn path_for(&self, event_type: &EventType, partition: &PartitionId) -> PathBuf {
        // Event type names may contain path separators in pathological
        // configs; flatten them so the key stays a single file name.
        let name = format!("{}--{}.json", event_type, partition).replace(['/', '\\'], "_");
        self.dir.join(name)
    }
}

#[async_trait]
impl CursorStore for FileCursorStore {
    async fn read(
        &self,
        event_type: &EventType,
        partition: &PartitionId,
    ) -> Result<Option<Cursor>> {
        let path = self.path_for(event_type, partition);
        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(EventlineError::Storage(format!(
                    "reading {}: {e}",
                    path.display()
                )))
            }
        };
        let stored: StoredCursor = serde_json::from_slice(&bytes).map_err(|e| {
            EventlineError::Storage(format!("parsing {}: {e}", path.display()))
        })?;
        if &stored.event_type != event_type || &stored.partition != partition {
            return Err(EventlineError::Storage(format!(
                "cursor file {} belongs to {}/{}",
                path.display(),
                stored.event_type,
                stored.partition
            )));
        }
        Ok(Some(stored.cursor))
    }

    async fn write(&self, cursor: &EventTypeCursor) -> Result<()> {
        let path = self.path_for(&cursor.event_type, &cursor.partition);
        let stored = StoredCursor {
            event_type: cursor.event_type.clone(),
            partition: cursor.partition.clone(),
            cursor: cursor.cursor.clone(),
            committed_at: Utc::now(),
        };
        let json = serde_json::to_vec_pretty(&stored)
            .map_err(|e| EventlineError::Storage(format!("encoding cursor: {e}")))?;

        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, &json)
            .await
            .map_err(|e| EventlineError::Storage(format!("writing {}: {e}", tmp.display())))?;
        tokio::fs::rename(&tmp, &path)
            .await
            .map_err(|e| EventlineError::Storage(format!("renaming {}: {e}", path.display())))?;
        Ok(())
    }
}
