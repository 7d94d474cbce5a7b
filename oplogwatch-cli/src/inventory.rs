//! Per-project cluster inventory
//!
//! Lists a project's clusters and their configured oplog sizes, keyed by the
//! case-folded cluster name. Built once per project and read by the join
//! against primary processes; discarded when the project is done.

use std::collections::HashMap;

use oplogwatch_shared::{Cluster, ClusterKey, Project};
use tracing::debug;

use crate::atlas::InventoryProvider;
use crate::error::ReportError;

/// Cluster lookups for one project
#[derive(Debug, Clone, Default)]
pub struct ProjectInventory {
    clusters: HashMap<ClusterKey, Cluster>,
    oplog_sizes: HashMap<ClusterKey, i64>,
}

impl ProjectInventory {
    /// List the project's clusters and fetch each cluster's oplog size.
    ///
    /// Any provider failure is fatal; a cluster without a configured oplog
    /// size is not.
    pub async fn resolve<P>(provider: &P, project: &Project) -> Result<Self, ReportError>
    where
        P: InventoryProvider + ?Sized,
    {
        let clusters = provider
            .list_clusters(&project.id)
            .await
            .map_err(|source| ReportError::ListClusters {
                project_id: project.id.clone(),
                source,
            })?;

        let mut inventory = ProjectInventory::default();

        for cluster in clusters {
            let size = provider
                .get_oplog_size_mb(&project.id, &cluster.name)
                .await
                .map_err(|source| ReportError::OplogConfig {
                    project_id: project.id.clone(),
                    cluster: cluster.name.clone(),
                    source,
                })?;

            debug!(
                "Cluster {} ({}, {}): oplog size {:?} MB",
                cluster.name,
                cluster.id,
                cluster.cluster_type.as_deref().unwrap_or("unknown type"),
                size
            );
            inventory.insert(cluster.with_oplog_size_mb(size));
        }

        if inventory.is_empty() {
            debug!("Project {} has no clusters", project.id);
        } else {
            debug!("Project {}: {} clusters", project.id, inventory.len());
        }

        Ok(inventory)
    }

    /// Add a cluster; a later cluster with the same key replaces an earlier one
    pub fn insert(&mut self, cluster: Cluster) {
        let key = cluster.key();
        match cluster.oplog_size_mb {
            Some(size) => {
                self.oplog_sizes.insert(key.clone(), size);
            }
            None => {
                self.oplog_sizes.remove(&key);
            }
        }
        self.clusters.insert(key, cluster);
    }

    pub fn cluster(&self, key: &ClusterKey) -> Option<&Cluster> {
        self.clusters.get(key)
    }

    pub fn oplog_size_mb(&self, key: &ClusterKey) -> Option<i64> {
        self.oplog_sizes.get(key).copied()
    }

    pub fn len(&self) -> usize {
        self.clusters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clusters.is_empty()
    }
}
