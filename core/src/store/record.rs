use crate::analysis::{Alert, AnalysisResult, CrowdLevel};
use crate::prelude::VideoReference;
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Row of the `video_analysis` table.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AnalysisRecord {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    pub user_id: Option<String>,
    pub video_url: Option<String>,
    pub file_path: Option<String>,
    pub total_people: u32,
    pub crowd_level: CrowdLevel,
    pub average_density: f64,
    pub safe_zones: u32,
    pub warning_zones: u32,
    pub danger_zones: u32,
    pub alerts: Vec<Alert>,
}

impl AnalysisRecord {
    pub fn new(result: &AnalysisResult, video: &VideoReference) -> Self {
        Self::at(result, video, Utc::now())
    }

    pub fn at(result: &AnalysisResult, video: &VideoReference, created_at: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            created_at,
            user_id: None,
            video_url: video.video_url.clone(),
            file_path: video.video_path.clone(),
            total_people: result.total_people,
            crowd_level: result.crowd_level,
            average_density: result.average_density,
            safe_zones: result.safe_zones,
            warning_zones: result.warning_zones,
            danger_zones: result.danger_zones,
            alerts: result.alerts.clone(),
        }
    }

    pub fn result(&self) -> AnalysisResult {
        AnalysisResult {
            total_people: self.total_people,
            crowd_level: self.crowd_level,
            average_density: self.average_density,
            safe_zones: self.safe_zones,
            warning_zones: self.warning_zones,
            danger_zones: self.danger_zones,
            alerts: self.alerts.clone(),
        }
    }

    pub fn cursor(&self) -> Cursor {
        Cursor {
            created_at: self.created_at,
            id: self.id,
        }
    }
}

/// Position of a row in creation order; ties on `created_at` break by id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Cursor {
    pub created_at: DateTime<Utc>,
    pub id: Uuid,
}

impl Ord for Cursor {
    fn cmp(&self, other: &Self) -> Ordering {
        self.created_at
            .cmp(&other.created_at)
            .then_with(|| self.id.cmp(&other.id))
    }
}

impl PartialOrd for Cursor {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for Cursor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}_{}",
            self.created_at.to_rfc3339_opts(SecondsFormat::AutoSi, true),
            self.id
        )
    }
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("invalid cursor: {0}")]
pub struct CursorParseError(String);

impl FromStr for Cursor {
    type Err = CursorParseError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let (timestamp, id) = value
            .rsplit_once('_')
            .ok_or_else(|| CursorParseError(value.to_string()))?;
        let created_at = DateTime::parse_from_rfc3339(timestamp)
            .map_err(|err| CursorParseError(err.to_string()))?
            .with_timezone(&Utc);
        let id = Uuid::parse_str(id)
            .map_err(|err| CursorParseError(err.to_string()))?;
        Ok(Self { created_at, id })
    }
}

impl Serialize for Cursor {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Cursor {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::Scenario;

    #[test]
    fn record_keeps_reference_and_result() {
        let result = Scenario::get(1).unwrap().to_result();
        let record = AnalysisRecord::new(&result, &VideoReference::from_url("https://x/v.mp4"));

        assert_eq!(record.user_id, None);
        assert_eq!(record.file_path, None);
        assert_eq!(record.video_url.as_deref(), Some("https://x/v.mp4"));
        assert_eq!(record.result(), result);
    }

    #[test]
    fn record_serializes_table_columns() {
        let result = Scenario::get(0).unwrap().to_result();
        let record = AnalysisRecord::new(&result, &VideoReference::from_path("public/1-a.mp4"));
        let value = serde_json::to_value(&record).unwrap();

        assert_eq!(value["total_people"], 45);
        assert_eq!(value["crowd_level"], "Safe");
        assert_eq!(value["file_path"], "public/1-a.mp4");
        assert!(value["user_id"].is_null());
    }

    #[test]
    fn cursor_text_form_parses_back() {
        let result = Scenario::get(2).unwrap().to_result();
        let record = AnalysisRecord::new(&result, &VideoReference::default());
        let cursor = record.cursor();

        let parsed: Cursor = cursor.to_string().parse().unwrap();
        assert_eq!(parsed, cursor);
        assert!("not-a-cursor".parse::<Cursor>().is_err());
    }
}
