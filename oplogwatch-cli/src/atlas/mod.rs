//! Atlas inventory and metrics provider
//!
//! [`InventoryProvider`] is the seam between the report and the Atlas Admin
//! API. [`AtlasClient`] implements it over HTTPS with digest authentication;
//! tests substitute an in-memory provider.

pub mod client;
pub mod digest;

use async_trait::async_trait;
use oplogwatch_shared::{Cluster, MeasurementQuery, MeasurementSeries, Page, Process, Project};

pub use client::{AtlasClient, AtlasConfig};

/// Read-only view of the Atlas inventory
#[async_trait]
pub trait InventoryProvider: Send + Sync {
    /// One page of the projects visible to the API key
    async fn list_projects(&self, page_num: u32, items_per_page: u32) -> Result<Page<Project>, ApiError>;

    /// Every cluster in a project
    async fn list_clusters(&self, project_id: &str) -> Result<Vec<Cluster>, ApiError>;

    /// Configured oplog size of a cluster, `None` when unset
    async fn get_oplog_size_mb(&self, project_id: &str, cluster_name: &str) -> Result<Option<i64>, ApiError>;

    /// Every process in a project
    async fn list_processes(&self, project_id: &str) -> Result<Vec<Process>, ApiError>;

    /// Time series for one process
    async fn get_measurements(
        &self,
        project_id: &str,
        host: &str,
        port: u16,
        query: &MeasurementQuery,
    ) -> Result<Vec<MeasurementSeries>, ApiError>;
}

/// Provider errors
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Authentication failed: {0}")]
    Auth(String),

    /// The requested measurement does not exist on this cluster tier
    #[error("Metric not supported: {0}")]
    MetricUnsupported(String),

    #[error("HTTP {status} ({code}): {detail}")]
    Status { status: u16, code: String, detail: String },

    #[error("Parse error: {0}")]
    Parse(String),
}

impl ApiError {
    pub fn is_metric_unsupported(&self) -> bool {
        matches!(self, ApiError::MetricUnsupported(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metric_unsupported_classification() {
        assert!(ApiError::MetricUnsupported("OPLOG_MASTER_TIME".into()).is_metric_unsupported());
        assert!(!ApiError::Network("timeout".into()).is_metric_unsupported());

        // A generic error whose text mentions the code is still generic
        let status = ApiError::Status {
            status: 400,
            code: "INVALID_QUERY_PARAMETER".into(),
            detail: "INVALID_METRIC_NAME".into(),
        };
        assert!(!status.is_metric_unsupported());
    }

    #[test]
    fn test_error_display() {
        let err = ApiError::Status {
            status: 404,
            code: "GROUP_NOT_FOUND".into(),
            detail: "No group with ID abc exists.".into(),
        };
        assert_eq!(err.to_string(), "HTTP 404 (GROUP_NOT_FOUND): No group with ID abc exists.");
    }
}
