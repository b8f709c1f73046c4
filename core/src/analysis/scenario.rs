use crate::analysis::model::{Alert, AlertLevel, AnalysisResult, CrowdLevel};

/// One of the fixed records an analysis result is built from.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Scenario {
    pub people: u32,
    pub density: f64,
    pub safe: u32,
    pub warning: u32,
    pub danger: u32,
    pub level: CrowdLevel,
}

/// Literal alert line emitted for a crowd level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AlertTemplate {
    pub time: &'static str,
    pub message: &'static str,
    pub level: AlertLevel,
}

pub const SCENARIOS: [Scenario; 5] = [
    Scenario {
        people: 45,
        density: 0.35,
        safe: 4,
        warning: 1,
        danger: 0,
        level: CrowdLevel::Safe,
    },
    Scenario {
        people: 120,
        density: 0.55,
        safe: 2,
        warning: 3,
        danger: 1,
        level: CrowdLevel::Warning,
    },
    Scenario {
        people: 280,
        density: 0.82,
        safe: 1,
        warning: 2,
        danger: 3,
        level: CrowdLevel::Critical,
    },
    Scenario {
        people: 85,
        density: 0.42,
        safe: 3,
        warning: 2,
        danger: 0,
        level: CrowdLevel::Safe,
    },
    Scenario {
        people: 195,
        density: 0.68,
        safe: 2,
        warning: 3,
        danger: 2,
        level: CrowdLevel::Warning,
    },
];

const CRITICAL_ALERTS: [AlertTemplate; 4] = [
    AlertTemplate {
        time: "00:05",
        message: "High crowd density detected in Zone A",
        level: AlertLevel::Warning,
    },
    AlertTemplate {
        time: "00:28",
        message: "Critical overcrowding in Zone B - immediate action recommended",
        level: AlertLevel::Danger,
    },
    AlertTemplate {
        time: "00:45",
        message: "Multiple congestion points identified",
        level: AlertLevel::Danger,
    },
    AlertTemplate {
        time: "01:12",
        message: "Emergency exits showing restricted flow",
        level: AlertLevel::Danger,
    },
];

const WARNING_ALERTS: [AlertTemplate; 4] = [
    AlertTemplate {
        time: "00:10",
        message: "Moderate crowd density in Zone A",
        level: AlertLevel::Info,
    },
    AlertTemplate {
        time: "00:35",
        message: "Density increasing in Zone C - monitor closely",
        level: AlertLevel::Warning,
    },
    AlertTemplate {
        time: "00:52",
        message: "Flow rate decreasing in main corridor",
        level: AlertLevel::Warning,
    },
    AlertTemplate {
        time: "01:20",
        message: "Crowd movement stabilizing",
        level: AlertLevel::Info,
    },
];

const SAFE_ALERTS: [AlertTemplate; 3] = [
    AlertTemplate {
        time: "00:12",
        message: "Normal crowd density across all zones",
        level: AlertLevel::Info,
    },
    AlertTemplate {
        time: "00:40",
        message: "Good circulation patterns observed",
        level: AlertLevel::Info,
    },
    AlertTemplate {
        time: "01:05",
        message: "All zones within safe parameters",
        level: AlertLevel::Info,
    },
];

/// Alert timeline for a crowd level, in chronological order.
pub fn alert_templates(level: CrowdLevel) -> &'static [AlertTemplate] {
    match level {
        CrowdLevel::Critical => &CRITICAL_ALERTS,
        CrowdLevel::Warning => &WARNING_ALERTS,
        CrowdLevel::Safe => &SAFE_ALERTS,
    }
}

impl Scenario {
    /// Scenario at `index`, or `None` past the end of the table.
    pub fn get(index: usize) -> Option<&'static Scenario> {
        SCENARIOS.get(index)
    }

    pub fn to_result(&self) -> AnalysisResult {
        let alerts = alert_templates(self.level)
            .iter()
            .map(|template| Alert {
                time: template.time.to_string(),
                message: template.message.to_string(),
                level: template.level,
            })
            .collect();

        AnalysisResult {
            total_people: self.people,
            crowd_level: self.level,
            average_density: self.density,
            safe_zones: self.safe,
            warning_zones: self.warning,
            danger_zones: self.danger,
            alerts,
        }
    }

    /// Index of the scenario that produced `result`, if any.
    pub fn position_of(result: &AnalysisResult) -> Option<usize> {
        SCENARIOS
            .iter()
            .position(|scenario| scenario.to_result() == *result)
    }
}
