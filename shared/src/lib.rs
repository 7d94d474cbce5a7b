//! Shared types for oplogwatch
//!
//! This crate contains the data model the report is built from:
//! - Inventory types (projects, clusters, processes)
//! - Measurement series and queries
//! - Atlas Admin API wire records

pub mod inventory;
pub mod measurements;
pub mod messages;

pub use inventory::*;
pub use measurements::*;
pub use messages::*;
