//! Fatal report errors

use crate::atlas::ApiError;

/// Errors that abort a report run
#[derive(Debug, thiserror::Error)]
pub enum ReportError {
    #[error("Failed to list projects (page {page}): {source}")]
    ListProjects {
        page: u32,
        #[source]
        source: ApiError,
    },

    #[error("Failed to list clusters for project {project_id}: {source}")]
    ListClusters {
        project_id: String,
        #[source]
        source: ApiError,
    },

    #[error("Failed to get oplog configuration for cluster {cluster} in project {project_id}: {source}")]
    OplogConfig {
        project_id: String,
        cluster: String,
        #[source]
        source: ApiError,
    },

    #[error("Failed to list processes for project {project_id}: {source}")]
    ListProcesses {
        project_id: String,
        #[source]
        source: ApiError,
    },

    #[error("Failed to write report: {0}")]
    Write(#[from] csv::Error),
}
