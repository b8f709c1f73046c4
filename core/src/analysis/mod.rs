pub mod analyzer;
pub mod model;
pub mod scenario;

pub use analyzer::ScenarioAnalyzer;
pub use model::{Alert, AlertLevel, AnalysisResult, CrowdLevel};
pub use scenario::{AlertTemplate, Scenario, SCENARIOS};
