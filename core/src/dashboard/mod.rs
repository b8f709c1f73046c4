pub mod feed;
pub mod preview;
pub mod summary;

pub use feed::{DashboardFeed, FeedUpdate};
pub use preview::youtube_video_id;
pub use summary::{
    AlertHistoryEntry, AlertSeverity, DashboardSummary, DensityPoint, DensityStatus,
    RecentAnalysis, ZoneTotals,
};

/// Rows a dashboard aggregates over by default.
pub const DEFAULT_WINDOW: usize = 10;
