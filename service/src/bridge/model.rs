use crowdsafe_core::store::{AnalysisRecord, Cursor};
use serde::{Deserialize, Serialize};

/// Body of every failed response.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ErrorBody {
    pub error: String,
}

impl ErrorBody {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            error: message.into(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PageQuery {
    pub limit: Option<usize>,
    pub before: Option<Cursor>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DashboardQuery {
    pub window: Option<usize>,
}

/// Newest-first slice of the table plus the cursor for the next page.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisPage {
    pub rows: Vec<AnalysisRecord>,
    pub next_cursor: Option<Cursor>,
}

impl AnalysisPage {
    pub fn new(rows: Vec<AnalysisRecord>, limit: usize) -> Self {
        let next_cursor = if rows.len() == limit {
            rows.last().map(AnalysisRecord::cursor)
        } else {
            None
        };
        Self { rows, next_cursor }
    }
}
