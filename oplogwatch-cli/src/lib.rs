//! oplogwatch Library
//!
//! Core modules for the Atlas oplog health report.

pub mod atlas;
pub mod error;
pub mod inventory;
pub mod metrics;
pub mod paginate;
pub mod primary;
pub mod report;
pub mod run;

// Re-export the run entry points for convenience
pub use error::ReportError;
pub use run::{Reporter, RunSettings, RunSummary};
