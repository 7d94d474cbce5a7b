//! Primary process selection
//!
//! Keeps the replica set primaries of a project's process list and derives
//! each one's cluster key from its alias. Atlas aliases look like
//! `cluster0-shard-00-01.abcde.mongodb.net`; the cluster name is everything
//! before the last `-shard-`.

use oplogwatch_shared::{ClusterKey, Process};

/// Separator between the cluster name and the shard suffix of an alias
pub const SHARD_DELIMITER: &str = "-shard-";

/// A primary process and what its alias says about its cluster
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LocatedPrimary<'a> {
    /// Alias parsed; `key` is ready for the inventory join
    Keyed { process: &'a Process, key: ClusterKey },
    /// Alias not assigned yet (seen while a cluster is being created)
    EmptyAlias(&'a Process),
    /// Alias present but without a shard delimiter
    Unparsable(&'a Process),
}

/// Cluster key from an alias, splitting at the last shard delimiter
pub fn cluster_key_from_alias(alias: &str) -> Option<ClusterKey> {
    alias
        .rfind(SHARD_DELIMITER)
        .map(|idx| ClusterKey::new(&alias[..idx]))
}

/// Primaries in list order, each with its derived key
pub fn locate_primaries(processes: &[Process]) -> impl Iterator<Item = LocatedPrimary<'_>> {
    processes.iter().filter(|p| p.is_primary()).map(|process| {
        if process.alias.is_empty() {
            LocatedPrimary::EmptyAlias(process)
        } else {
            match cluster_key_from_alias(&process.alias) {
                Some(key) => LocatedPrimary::Keyed { process, key },
                None => LocatedPrimary::Unparsable(process),
            }
        }
    })
}
