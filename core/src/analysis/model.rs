use serde::{Deserialize, Serialize};
use std::fmt;

/// Coarse severity label attached to every analysis.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum CrowdLevel {
    Safe,
    Warning,
    Critical,
}

impl CrowdLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            CrowdLevel::Safe => "Safe",
            CrowdLevel::Warning => "Warning",
            CrowdLevel::Critical => "Critical",
        }
    }
}

impl fmt::Display for CrowdLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Level of a single timeline alert.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum AlertLevel {
    Info,
    Warning,
    Danger,
}

/// Timeline entry; `time` is an `mm:ss` offset into the video.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Alert {
    pub time: String,
    pub message: String,
    pub level: AlertLevel,
}

impl Alert {
    /// Offset in seconds, or `None` when `time` is not `mm:ss`.
    pub fn offset_seconds(&self) -> Option<u32> {
        let (minutes, seconds) = self.time.split_once(':')?;
        if minutes.len() != 2 || seconds.len() != 2 {
            return None;
        }
        let minutes: u32 = minutes.parse().ok()?;
        let seconds: u32 = seconds.parse().ok()?;
        if seconds >= 60 {
            return None;
        }
        Some(minutes * 60 + seconds)
    }
}

/// Result returned by the analyze function and persisted once per call.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisResult {
    pub total_people: u32,
    pub crowd_level: CrowdLevel,
    pub average_density: f64,
    pub safe_zones: u32,
    pub warning_zones: u32,
    pub danger_zones: u32,
    pub alerts: Vec<Alert>,
}

impl AnalysisResult {
    pub fn alert_count(&self, level: AlertLevel) -> usize {
        self.alerts
            .iter()
            .filter(|alert| alert.level == level)
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn alert(time: &str) -> Alert {
        Alert {
            time: time.into(),
            message: "m".into(),
            level: AlertLevel::Info,
        }
    }

    #[test]
    fn offset_parses_minutes_and_seconds() {
        assert_eq!(alert("01:12").offset_seconds(), Some(72));
        assert_eq!(alert("00:05").offset_seconds(), Some(5));
    }

    #[test]
    fn offset_rejects_malformed_times() {
        assert_eq!(alert("1:12").offset_seconds(), None);
        assert_eq!(alert("00:75").offset_seconds(), None);
        assert_eq!(alert("later").offset_seconds(), None);
    }

    #[test]
    fn result_serializes_with_function_field_names() {
        let result = AnalysisResult {
            total_people: 45,
            crowd_level: CrowdLevel::Safe,
            average_density: 0.35,
            safe_zones: 4,
            warning_zones: 1,
            danger_zones: 0,
            alerts: vec![Alert {
                time: "00:12".into(),
                message: "Normal crowd density across all zones".into(),
                level: AlertLevel::Info,
            }],
        };

        let value = serde_json::to_value(&result).unwrap();
        assert_eq!(value["totalPeople"], 45);
        assert_eq!(value["crowdLevel"], "Safe");
        assert_eq!(value["averageDensity"], 0.35);
        assert_eq!(value["dangerZones"], 0);
        assert_eq!(value["alerts"][0]["level"], "info");
    }
}
