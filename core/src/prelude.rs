use crate::analysis::AnalysisResult;
use serde::{Deserialize, Serialize};

/// Reference to the video an analysis was requested for.
///
/// Mirrors the analyze function body: either a path inside the upload bucket,
/// a remote link, or (accepted but unusual) neither.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoReference {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub video_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub video_url: Option<String>,
}

impl VideoReference {
    pub fn from_path(path: impl Into<String>) -> Self {
        Self {
            video_path: Some(path.into()),
            video_url: None,
        }
    }

    pub fn from_url(url: impl Into<String>) -> Self {
        Self {
            video_path: None,
            video_url: Some(url.into()),
        }
    }
}

/// Capability that turns a video reference into an analysis result.
///
/// Implementations must not fail; persistence errors belong to the caller.
pub trait Analyzer: Send + Sync {
    fn analyze(&self, video: &VideoReference) -> AnalysisResult;
}

/// Rejections raised before any upload or network call happens.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Please upload a valid video file")]
    NotVideo { content_type: String },
    #[error("File size must be less than {limit_mb}MB")]
    TooLarge { size: u64, limit_mb: u64 },
    #[error("invalid file name: {0}")]
    InvalidName(String),
    #[error("Please enter a video URL")]
    MissingUrl,
}

/// Failures of the object storage bucket.
#[derive(thiserror::Error, Debug)]
pub enum StorageError {
    #[error("storage io: {0}")]
    Io(#[from] std::io::Error),
    #[error("object {0} already exists")]
    Conflict(String),
    #[error(transparent)]
    Validation(#[from] ValidationError),
}

/// Failures of the analysis table.
#[derive(thiserror::Error, Debug)]
pub enum StoreError {
    #[error("store io: {0}")]
    Io(#[from] std::io::Error),
    #[error("store serialization: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Errors surfaced by the analyze operation.
#[derive(thiserror::Error, Debug)]
pub enum AnalysisError {
    #[error("Failed to save analysis")]
    Persist(#[source] StoreError),
}

pub type StoreResult<T> = Result<T, StoreError>;
