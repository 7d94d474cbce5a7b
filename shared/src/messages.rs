//! Atlas Admin API wire records
//!
//! JSON shapes returned by the Atlas Admin API (v1.0). Only the fields the
//! report reads are declared; everything else in a response is ignored.

use serde::{Deserialize, Serialize};

use crate::inventory::{Cluster, Page, Process, ProcessRole, Project};
use crate::measurements::{DataPoint, MeasurementSeries};

/// Error code Atlas returns when a measurement is unavailable on the
/// cluster's tier (free and shared clusters have no oplog metrics)
pub const INVALID_METRIC_NAME: &str = "INVALID_METRIC_NAME";

/// Envelope of every paginated listing
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaginatedResponse<T> {
    #[serde(default = "Vec::new")]
    pub results: Vec<T>,

    /// Only present when the request sets `includeCount=true`
    #[serde(default)]
    pub total_count: u64,
}

impl<T> PaginatedResponse<T> {
    pub fn into_page<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page::new(self.results.into_iter().map(f).collect(), self.total_count)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectRecord {
    pub id: String,
    pub name: String,
}

impl From<ProjectRecord> for Project {
    fn from(record: ProjectRecord) -> Self {
        Project::new(record.id, record.name)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusterRecord {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub cluster_type: Option<String>,
}

impl From<ClusterRecord> for Cluster {
    fn from(record: ClusterRecord) -> Self {
        Cluster::new(record.id, record.name).with_cluster_type(record.cluster_type)
    }
}

/// `processArgs` of a cluster
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProcessArgsRecord {
    #[serde(rename = "oplogSizeMB", default)]
    pub oplog_size_mb: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessRecord {
    pub hostname: String,
    pub port: u16,
    #[serde(default)]
    pub type_name: String,
    #[serde(default)]
    pub user_alias: Option<String>,
    #[serde(default)]
    pub replica_set_name: Option<String>,
    #[serde(default)]
    pub shard_name: Option<String>,
}

impl From<ProcessRecord> for Process {
    fn from(record: ProcessRecord) -> Self {
        Process::new(
            record.hostname,
            record.port,
            ProcessRole::from_type_name(&record.type_name),
            record.user_alias.unwrap_or_default(),
        )
        .with_replica_set(record.replica_set_name, record.shard_name)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MeasurementsResponse {
    #[serde(default)]
    pub measurements: Vec<MeasurementRecord>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MeasurementRecord {
    pub name: String,
    #[serde(default)]
    pub units: Option<String>,
    #[serde(default)]
    pub data_points: Vec<DataPointRecord>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataPointRecord {
    pub timestamp: String,
    #[serde(default)]
    pub value: Option<f64>,
}

impl From<MeasurementRecord> for MeasurementSeries {
    fn from(record: MeasurementRecord) -> Self {
        MeasurementSeries {
            name: record.name,
            units: record.units,
            data_points: record
                .data_points
                .into_iter()
                .map(|p| DataPoint::new(p.timestamp, p.value))
                .collect(),
        }
    }
}

/// Error body Atlas attaches to non-2xx responses
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorBody {
    #[serde(default)]
    pub error: Option<u16>,
    #[serde(default)]
    pub error_code: Option<String>,
    #[serde(default)]
    pub detail: Option<String>,
    #[serde(default)]
    pub reason: Option<String>,
}

impl ErrorBody {
    pub fn is_invalid_metric_name(&self) -> bool {
        self.error_code.as_deref() == Some(INVALID_METRIC_NAME)
    }
}
