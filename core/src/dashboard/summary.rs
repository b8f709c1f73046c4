use crate::analysis::{AlertLevel, CrowdLevel};
use crate::dashboard::preview::youtube_video_id;
use crate::math::stats::StatsHelper;
use crate::store::AnalysisRecord;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

const DENSITY_SERIES_LEN: usize = 9;
const ALERT_HISTORY_ROWS: usize = 5;

/// Label for the average density card.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum DensityStatus {
    Safe,
    Warning,
    Critical,
}

impl DensityStatus {
    pub fn from_density(density: f64) -> Self {
        if density > 0.7 {
            DensityStatus::Critical
        } else if density > 0.4 {
            DensityStatus::Warning
        } else {
            DensityStatus::Safe
        }
    }
}

/// Severity shown in the alert history table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AlertSeverity {
    Critical,
    High,
    Medium,
}

impl From<AlertLevel> for AlertSeverity {
    fn from(level: AlertLevel) -> Self {
        match level {
            AlertLevel::Danger => AlertSeverity::Critical,
            AlertLevel::Warning => AlertSeverity::High,
            AlertLevel::Info => AlertSeverity::Medium,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ZoneTotals {
    pub safe: u64,
    pub warning: u64,
    pub danger: u64,
}

impl ZoneTotals {
    pub fn total(&self) -> u64 {
        self.safe + self.warning + self.danger
    }

    /// Percent shares of (safe, warning, danger).
    pub fn shares(&self) -> (f64, f64, f64) {
        let total = self.total();
        (
            StatsHelper::share_percent(self.safe, total),
            StatsHelper::share_percent(self.warning, total),
            StatsHelper::share_percent(self.danger, total),
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DensityPoint {
    pub time: String,
    pub density: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlertHistoryEntry {
    pub id: String,
    pub time: DateTime<Utc>,
    pub zone: String,
    pub level: AlertSeverity,
    pub status: String,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecentAnalysis {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    pub crowd_level: CrowdLevel,
    pub total_people: u32,
    pub average_density: f64,
    pub video_url: Option<String>,
    pub youtube_id: Option<String>,
}

/// Aggregates over a window of rows ordered newest first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardSummary {
    pub analyses: usize,
    pub total_people: u64,
    pub average_density: f64,
    pub density_status: DensityStatus,
    pub zones: ZoneTotals,
    pub zone_shares: [f64; 3],
    pub critical_count: usize,
    pub overall_status: CrowdLevel,
    pub density_series: Vec<DensityPoint>,
    pub alert_history: Vec<AlertHistoryEntry>,
    pub recent: Vec<RecentAnalysis>,
}

impl DashboardSummary {
    pub fn from_rows(rows: &[AnalysisRecord]) -> Self {
        let total_people = rows.iter().map(|row| u64::from(row.total_people)).sum();
        let densities: Vec<f64> = rows.iter().map(|row| row.average_density).collect();
        let average_density = StatsHelper::mean(&densities);

        let zones = rows
            .iter()
            .fold(ZoneTotals::default(), |acc, row| ZoneTotals {
                safe: acc.safe + u64::from(row.safe_zones),
                warning: acc.warning + u64::from(row.warning_zones),
                danger: acc.danger + u64::from(row.danger_zones),
            });
        let (safe_share, warning_share, danger_share) = zones.shares();

        let critical_count = rows
            .iter()
            .filter(|row| row.crowd_level == CrowdLevel::Critical)
            .count();

        Self {
            analyses: rows.len(),
            total_people,
            average_density,
            density_status: DensityStatus::from_density(average_density),
            zones,
            zone_shares: [safe_share, warning_share, danger_share],
            critical_count,
            overall_status: overall_status(critical_count, rows.len()),
            density_series: density_series(rows),
            alert_history: alert_history(rows),
            recent: rows.iter().map(recent_analysis).collect(),
        }
    }
}

/// Critical when most rows are critical, Warning when any is.
pub fn overall_status(critical_count: usize, total: usize) -> CrowdLevel {
    if critical_count * 2 > total {
        CrowdLevel::Critical
    } else if critical_count > 0 {
        CrowdLevel::Warning
    } else {
        CrowdLevel::Safe
    }
}

fn density_series(rows: &[AnalysisRecord]) -> Vec<DensityPoint> {
    rows.iter()
        .take(DENSITY_SERIES_LEN)
        .rev()
        .map(|row| DensityPoint {
            time: row.created_at.format("%H:%M").to_string(),
            density: row.average_density,
        })
        .collect()
}

fn alert_history(rows: &[AnalysisRecord]) -> Vec<AlertHistoryEntry> {
    rows.iter()
        .take(ALERT_HISTORY_ROWS)
        .enumerate()
        .flat_map(|(row_index, row)| {
            row.alerts
                .iter()
                .enumerate()
                .map(move |(alert_index, alert)| AlertHistoryEntry {
                    id: format!("{}-{}", row_index, alert_index),
                    time: row.created_at,
                    zone: format!("Analysis {}", row_index + 1),
                    level: alert.level.into(),
                    status: "Resolved".to_string(),
                    message: alert.message.clone(),
                })
        })
        .collect()
}

fn recent_analysis(row: &AnalysisRecord) -> RecentAnalysis {
    RecentAnalysis {
        id: row.id,
        created_at: row.created_at,
        crowd_level: row.crowd_level,
        total_people: row.total_people,
        average_density: row.average_density,
        video_url: row.video_url.clone(),
        youtube_id: row.video_url.as_deref().and_then(youtube_video_id),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::Scenario;
    use crate::prelude::VideoReference;
    use chrono::{Duration, TimeZone};

    fn rows_newest_first(scenarios: &[usize]) -> Vec<AnalysisRecord> {
        let base = Utc.with_ymd_and_hms(2025, 3, 1, 9, 0, 0).unwrap();
        let mut rows: Vec<AnalysisRecord> = scenarios
            .iter()
            .enumerate()
            .map(|(offset, &scenario)| {
                AnalysisRecord::at(
                    &Scenario::get(scenario).unwrap().to_result(),
                    &VideoReference::from_url("https://youtu.be/clip"),
                    base + Duration::minutes(offset as i64),
                )
            })
            .collect();
        rows.reverse();
        rows
    }

    #[test]
    fn empty_window_is_safe_and_zeroed() {
        let summary = DashboardSummary::from_rows(&[]);
        assert_eq!(summary.analyses, 0);
        assert_eq!(summary.average_density, 0.0);
        assert_eq!(summary.density_status, DensityStatus::Safe);
        assert_eq!(summary.overall_status, CrowdLevel::Safe);
        assert_eq!(summary.zone_shares, [0.0, 0.0, 0.0]);
        assert!(summary.density_series.is_empty());
    }

    #[test]
    fn totals_and_status_follow_rows() {
        let rows = rows_newest_first(&[0, 2, 1]);
        let summary = DashboardSummary::from_rows(&rows);

        assert_eq!(summary.total_people, 45 + 280 + 120);
        let expected_density = (0.35 + 0.82 + 0.55) / 3.0;
        assert!((summary.average_density - expected_density).abs() < 1e-9);
        assert_eq!(summary.density_status, DensityStatus::Warning);
        assert_eq!(
            summary.zones,
            ZoneTotals {
                safe: 7,
                warning: 6,
                danger: 4
            }
        );
        assert_eq!(summary.critical_count, 1);
        assert_eq!(summary.overall_status, CrowdLevel::Warning);
    }

    #[test]
    fn majority_critical_is_critical() {
        assert_eq!(overall_status(2, 3), CrowdLevel::Critical);
        assert_eq!(overall_status(1, 2), CrowdLevel::Warning);
        assert_eq!(overall_status(0, 4), CrowdLevel::Safe);
    }

    #[test]
    fn density_series_is_oldest_first_and_capped() {
        let rows = rows_newest_first(&[0, 1, 2, 3, 4, 0, 1, 2, 3, 4]);
        let summary = DashboardSummary::from_rows(&rows);

        assert_eq!(summary.density_series.len(), 9);
        assert_eq!(summary.density_series[0].time, "09:01");
        assert_eq!(summary.density_series[8].time, "09:09");
    }

    #[test]
    fn alert_history_covers_five_newest_rows() {
        let rows = rows_newest_first(&[0, 0, 0, 0, 0, 2]);
        let summary = DashboardSummary::from_rows(&rows);

        // newest row is the critical one, the remaining four are safe
        assert_eq!(summary.alert_history.len(), 4 + 4 * 3);
        let first = &summary.alert_history[0];
        assert_eq!(first.id, "0-0");
        assert_eq!(first.zone, "Analysis 1");
        assert_eq!(first.level, AlertSeverity::High);
        assert_eq!(summary.alert_history[1].level, AlertSeverity::Critical);
        assert_eq!(summary.alert_history[4].level, AlertSeverity::Medium);
        assert!(summary
            .alert_history
            .iter()
            .all(|entry| entry.status == "Resolved"));
    }

    #[test]
    fn recent_rows_carry_preview_ids() {
        let rows = rows_newest_first(&[3]);
        let summary = DashboardSummary::from_rows(&rows);
        assert_eq!(summary.recent[0].youtube_id.as_deref(), Some("clip"));
    }
}
