use crate::store::record::AnalysisRecord;
use tokio::sync::broadcast;

const DEFAULT_FEED_CAPACITY: usize = 64;

/// Fan-out of inserted rows to every live subscriber.
///
/// Slow subscribers observe `RecvError::Lagged` and must resynchronise with a
/// paginated read.
#[derive(Debug, Clone)]
pub struct ChangeFeed {
    sender: broadcast::Sender<AnalysisRecord>,
}

impl ChangeFeed {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_FEED_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Returns how many subscribers received the row.
    pub fn publish(&self, record: AnalysisRecord) -> usize {
        self.sender.send(record).unwrap_or(0)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<AnalysisRecord> {
        self.sender.subscribe()
    }
}

impl Default for ChangeFeed {
    fn default() -> Self {
        Self::new()
    }
}
