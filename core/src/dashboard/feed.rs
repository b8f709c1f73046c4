use crate::dashboard::summary::DashboardSummary;
use crate::prelude::StoreResult;
use crate::store::{AnalysisRecord, AnalysisStore};
use crate::telemetry::log::LogManager;
use tokio::sync::broadcast::{self, error::RecvError};

/// Outcome of waiting for the next change notification.
#[derive(Debug, Clone, PartialEq)]
pub enum FeedUpdate {
    /// A row was folded into the window.
    Applied(AnalysisRecord),
    /// The subscriber lagged and the window was reloaded.
    Resynced { skipped: u64 },
    /// The store dropped the feed.
    Closed,
}

/// Bounded newest-first window of rows kept current from the change feed.
///
/// Each notification carries the inserted row, so the window is updated in
/// place; the store is only read again after the subscriber lagged.
pub struct DashboardFeed {
    window: Vec<AnalysisRecord>,
    capacity: usize,
    logger: LogManager,
}

impl DashboardFeed {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            window: Vec::with_capacity(capacity),
            capacity,
            logger: LogManager::new("dashboard"),
        }
    }

    /// Fills the window from the store.
    pub fn load(&mut self, store: &dyn AnalysisStore) -> StoreResult<()> {
        self.replace(store.recent(self.capacity)?);
        Ok(())
    }

    /// Replaces the window with `rows`, in any order.
    pub fn replace(&mut self, mut rows: Vec<AnalysisRecord>) {
        rows.sort_by_key(|row| std::cmp::Reverse(row.cursor()));
        rows.dedup_by_key(|row| row.id);
        rows.truncate(self.capacity);
        self.window = rows;
    }

    /// Places `record` by creation order and drops rows past the capacity.
    pub fn apply(&mut self, record: AnalysisRecord) {
        if self.window.iter().any(|row| row.id == record.id) {
            return;
        }
        let cursor = record.cursor();
        let at = self.window.partition_point(|row| row.cursor() > cursor);
        if at >= self.capacity {
            return;
        }
        self.window.insert(at, record);
        self.window.truncate(self.capacity);
    }

    /// Waits for one notification and folds it in.
    pub async fn next_update(
        &mut self,
        receiver: &mut broadcast::Receiver<AnalysisRecord>,
        store: &dyn AnalysisStore,
    ) -> StoreResult<FeedUpdate> {
        match receiver.recv().await {
            Ok(record) => {
                self.apply(record.clone());
                Ok(FeedUpdate::Applied(record))
            }
            Err(RecvError::Lagged(skipped)) => {
                self.logger
                    .warn(&format!("feed lagged by {} rows, reloading window", skipped));
                self.load(store)?;
                Ok(FeedUpdate::Resynced { skipped })
            }
            Err(RecvError::Closed) => Ok(FeedUpdate::Closed),
        }
    }

    pub fn rows(&self) -> &[AnalysisRecord] {
        &self.window
    }

    pub fn summary(&self) -> DashboardSummary {
        DashboardSummary::from_rows(&self.window)
    }
}
