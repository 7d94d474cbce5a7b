//! Atlas inventory types
//!
//! Projects, clusters and processes as seen by the report. These are the
//! domain shapes; the JSON records the Atlas API returns live in
//! [`crate::messages`] and convert into these.

use serde::{Deserialize, Serialize};

/// One page of a paginated listing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page<T> {
    /// Items on this page
    pub results: Vec<T>,

    /// Total number of items across all pages, as reported by the source
    pub total_count: u64,
}

impl<T> Page<T> {
    pub fn new(results: Vec<T>, total_count: u64) -> Self {
        Self { results, total_count }
    }

    /// Map every item on the page, keeping the total count
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            results: self.results.into_iter().map(f).collect(),
            total_count: self.total_count,
        }
    }
}

/// An Atlas project (a "group" in the API)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Project {
    pub id: String,
    pub name: String,
}

impl Project {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }
}

/// A cluster within a project
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cluster {
    pub id: String,
    pub name: String,

    /// `REPLICASET`, `SHARDED` or `GEOSHARDED`
    #[serde(default)]
    pub cluster_type: Option<String>,

    /// Configured oplog size; `None` when the cluster leaves it unset
    #[serde(default)]
    pub oplog_size_mb: Option<i64>,
}

impl Cluster {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            cluster_type: None,
            oplog_size_mb: None,
        }
    }

    pub fn with_cluster_type(mut self, cluster_type: Option<String>) -> Self {
        self.cluster_type = cluster_type;
        self
    }

    pub fn with_oplog_size_mb(mut self, size: Option<i64>) -> Self {
        self.oplog_size_mb = size;
        self
    }

    /// Lookup key for this cluster
    pub fn key(&self) -> ClusterKey {
        ClusterKey::new(&self.name)
    }
}

/// Case-folded cluster name used to join processes against clusters
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ClusterKey(String);

impl ClusterKey {
    pub fn new(name: &str) -> Self {
        Self(name.to_lowercase())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ClusterKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Replica set role of a process
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProcessRole {
    Primary,
    Secondary,
    Other,
}

impl ProcessRole {
    /// Map an Atlas `typeName` onto a role
    pub fn from_type_name(type_name: &str) -> Self {
        match type_name {
            "REPLICA_PRIMARY" => Self::Primary,
            "REPLICA_SECONDARY" => Self::Secondary,
            _ => Self::Other,
        }
    }
}

/// A running mongod/mongos process
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Process {
    pub hostname: String,
    pub port: u16,
    pub role: ProcessRole,

    /// Provider alias, `<cluster>-shard-<suffix>`; empty while a cluster is
    /// still being created
    #[serde(default)]
    pub alias: String,

    #[serde(default)]
    pub replica_set_name: Option<String>,

    /// Only set for processes of a sharded cluster
    #[serde(default)]
    pub shard_name: Option<String>,
}

impl Process {
    pub fn new(hostname: impl Into<String>, port: u16, role: ProcessRole, alias: impl Into<String>) -> Self {
        Self {
            hostname: hostname.into(),
            port,
            role,
            alias: alias.into(),
            replica_set_name: None,
            shard_name: None,
        }
    }

    pub fn with_replica_set(mut self, replica_set_name: Option<String>, shard_name: Option<String>) -> Self {
        self.replica_set_name = replica_set_name;
        self.shard_name = shard_name;
        self
    }

    pub fn is_primary(&self) -> bool {
        self.role == ProcessRole::Primary
    }
}
