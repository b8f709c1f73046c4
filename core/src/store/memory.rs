use crate::prelude::{StoreError, StoreResult};
use crate::store::feed::ChangeFeed;
use crate::store::record::{AnalysisRecord, Cursor};
use crate::store::rows::RowSet;
use crate::store::AnalysisStore;
use std::sync::RwLock;
use tokio::sync::broadcast;

/// In-process table; contents are lost on restart.
#[derive(Default)]
pub struct MemoryStore {
    rows: RwLock<RowSet>,
    feed: ChangeFeed,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn poisoned() -> StoreError {
    StoreError::Unavailable("row lock poisoned".into())
}

impl AnalysisStore for MemoryStore {
    fn insert(&self, record: AnalysisRecord) -> StoreResult<AnalysisRecord> {
        self.rows
            .write()
            .map_err(|_| poisoned())?
            .insert(record.clone());
        self.feed.publish(record.clone());
        Ok(record)
    }

    fn recent(&self, limit: usize) -> StoreResult<Vec<AnalysisRecord>> {
        Ok(self.rows.read().map_err(|_| poisoned())?.recent(limit))
    }

    fn page(&self, before: Option<&Cursor>, limit: usize) -> StoreResult<Vec<AnalysisRecord>> {
        Ok(self.rows.read().map_err(|_| poisoned())?.page(before, limit))
    }

    fn count(&self) -> StoreResult<usize> {
        Ok(self.rows.read().map_err(|_| poisoned())?.len())
    }

    fn subscribe(&self) -> broadcast::Receiver<AnalysisRecord> {
        self.feed.subscribe()
    }
}
