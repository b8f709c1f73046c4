//! HTTP client for the CrowdSafe service.
//!
//! Files are validated locally before anything is sent; the dashboard is kept
//! current from the service's insert stream.

pub mod api;
pub mod events;
pub mod progress;

pub use api::{ClientError, CrowdSafeClient, InsertStream};
pub use events::{FeedEvent, SseDecoder};
pub use progress::{Progress, ProgressStage};
