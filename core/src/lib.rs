//! Core model and plumbing for the CrowdSafe crowd-analysis service.
//!
//! The modules cover the scenario analyzer, upload validation and object
//! storage, the persisted analysis table with its change feed, and the
//! dashboard aggregates computed over recent analyses.

pub mod analysis;
pub mod dashboard;
pub mod math;
pub mod prelude;
pub mod store;
pub mod telemetry;
pub mod upload;

pub use prelude::{Analyzer, VideoReference};
