use crate::store::record::{AnalysisRecord, Cursor};

/// Rows kept in ascending cursor order.
#[derive(Debug, Default)]
pub(crate) struct RowSet {
    rows: Vec<AnalysisRecord>,
}

impl RowSet {
    pub(crate) fn from_unsorted(mut rows: Vec<AnalysisRecord>) -> Self {
        rows.sort_by_key(|row| row.cursor());
        Self { rows }
    }

    pub(crate) fn insert(&mut self, record: AnalysisRecord) {
        let cursor = record.cursor();
        let at = self.rows.partition_point(|row| row.cursor() <= cursor);
        self.rows.insert(at, record);
    }

    pub(crate) fn recent(&self, limit: usize) -> Vec<AnalysisRecord> {
        self.rows.iter().rev().take(limit).cloned().collect()
    }

    pub(crate) fn page(&self, before: Option<&Cursor>, limit: usize) -> Vec<AnalysisRecord> {
        let end = match before {
            Some(cursor) => self.rows.partition_point(|row| row.cursor() < *cursor),
            None => self.rows.len(),
        };
        self.rows[..end].iter().rev().take(limit).cloned().collect()
    }

    pub(crate) fn len(&self) -> usize {
        self.rows.len()
    }
}
