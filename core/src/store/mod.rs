//! The `video_analysis` table: append-only rows, newest-first reads and a
//! change feed that carries every inserted row.

pub mod feed;
pub mod jsonl;
pub mod memory;
pub mod record;
mod rows;

pub use feed::ChangeFeed;
pub use jsonl::JsonLinesStore;
pub use memory::MemoryStore;
pub use record::{AnalysisRecord, Cursor, CursorParseError};

use crate::prelude::StoreResult;
use tokio::sync::broadcast;

/// Persistent table of analysis rows.
pub trait AnalysisStore: Send + Sync {
    /// Appends a row and notifies subscribers once it is durable.
    fn insert(&self, record: AnalysisRecord) -> StoreResult<AnalysisRecord>;
    /// Up to `limit` rows, newest first.
    fn recent(&self, limit: usize) -> StoreResult<Vec<AnalysisRecord>>;
    /// Up to `limit` rows strictly older than `before`, newest first.
    fn page(&self, before: Option<&Cursor>, limit: usize) -> StoreResult<Vec<AnalysisRecord>>;
    fn count(&self) -> StoreResult<usize>;
    fn subscribe(&self) -> broadcast::Receiver<AnalysisRecord>;
}
