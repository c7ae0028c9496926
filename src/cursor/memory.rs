//! In-memory cursor store

use super::CursorStore;
use crate::error::Result;
use crate::model::{Cursor, EventType, EventTypeCursor, PartitionId};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;

/// Cursor store backed by a process-local map.
///
/// Commits do not survive a restart; intended for tests and for embedders
/// that handle durability elsewhere.
#[derive(Default)]
pub struct InMemoryCursorStore {
    cursors: Mutex<HashMap<(EventType, PartitionId), Cursor>>,
}

impl InMemoryCursorStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CursorStore for InMemoryCursorStore {
    async fn read(
        &self,
        event_type: &EventType,
        partition: &PartitionId,
    ) -> Result<Option<Cursor>> {
        let cursors = self.cursors.lock().unwrap_or_else(|e| e.into_inner());
        Ok(cursors
            .get(&(event_type.clone(), partition.clone()))
            .cloned())
    }

    async fn write(&self, cursor: &EventTypeCursor) -> Result<()> {
        let mut cursors = self.cursors.lock().unwrap_or_else(|e| e.into_inner());
        cursors.insert(
            (cursor.event_type.clone(), cursor.partition.clone()),
            cursor.cursor.clone(),
        );
        Ok(())
    }
}
