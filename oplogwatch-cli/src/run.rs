//! Report run
//!
//! Walks every project page by page and, for each project, joins its
//! primaries against the cluster inventory, aggregates their oplog metrics
//! and writes one row per primary. Everything runs sequentially, one
//! request in flight at a time.
//!
//! Listing failures abort the run; rows already written stay written.
//! Per-process problems only drop that process's row.

use std::io::Write;

use chrono::{DateTime, Utc};
use oplogwatch_shared::Project;
use tracing::{debug, info, warn};

use crate::atlas::InventoryProvider;
use crate::error::ReportError;
use crate::inventory::ProjectInventory;
use crate::metrics::{fetch_process_stats, HourBuckets, MeasurementWindow};
use crate::paginate::Paginator;
use crate::primary::{locate_primaries, LocatedPrimary};
use crate::report::{ReportRow, ReportWriter};

/// Run settings
#[derive(Debug, Clone)]
pub struct RunSettings {
    /// `itemsPerPage` for the project listing
    pub page_size: u32,
    /// Length of the trailing measurement window
    pub window_hours: u32,
}

impl Default for RunSettings {
    fn default() -> Self {
        Self {
            page_size: 50,
            window_hours: 24,
        }
    }
}

/// Counters for a finished run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub projects: u32,
    pub primaries: u32,
    pub rows: u32,
    pub skipped_empty_alias: u32,
    pub skipped_unresolved: u32,
    pub skipped_metrics: u32,
}

/// Drives one report run against a provider
pub struct Reporter<P, W: Write> {
    provider: P,
    writer: ReportWriter<W>,
    settings: RunSettings,
    buckets: HourBuckets,
}

impl<P, W> Reporter<P, W>
where
    P: InventoryProvider,
    W: Write,
{
    pub fn new(provider: P, writer: ReportWriter<W>, settings: RunSettings) -> Self {
        Self {
            provider,
            writer,
            settings,
            buckets: HourBuckets::default(),
        }
    }

    /// Hour buckets seen so far in this run
    pub fn hour_buckets(&self) -> &HourBuckets {
        &self.buckets
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    /// Write the header and one row per reportable primary.
    ///
    /// `now` fixes the measurement window for the whole run.
    pub async fn run(&mut self, now: DateTime<Utc>) -> Result<RunSummary, ReportError> {
        self.writer.write_header()?;

        let window = MeasurementWindow::trailing_hours(now, self.settings.window_hours);
        info!(
            "Measuring oplog from {} to {}",
            window.start.to_rfc3339(),
            window.end.to_rfc3339()
        );

        let mut summary = RunSummary::default();
        let mut pager = Paginator::new(self.settings.page_size);

        while let Some(page_num) = pager.next_page() {
            let page = self
                .provider
                .list_projects(page_num, pager.page_size())
                .await
                .map_err(|source| ReportError::ListProjects { page: page_num, source })?;

            debug!("Projects total count: {}, page: {}", page.total_count, page_num);
            pager.record_total(page.total_count);

            for project in &page.results {
                self.report_project(project, &window, &mut summary).await?;
                summary.projects += 1;
            }
        }

        Ok(summary)
    }

    async fn report_project(
        &mut self,
        project: &Project,
        window: &MeasurementWindow,
        summary: &mut RunSummary,
    ) -> Result<(), ReportError> {
        debug!("Project {} ({})", project.name, project.id);

        let inventory = ProjectInventory::resolve(&self.provider, project).await?;

        let processes = self
            .provider
            .list_processes(&project.id)
            .await
            .map_err(|source| ReportError::ListProcesses {
                project_id: project.id.clone(),
                source,
            })?;

        for located in locate_primaries(&processes) {
            summary.primaries += 1;

            let (process, key) = match located {
                LocatedPrimary::Keyed { process, key } => (process, key),
                LocatedPrimary::EmptyAlias(process) => {
                    debug!("Skipping {}:{}: no alias yet", process.hostname, process.port);
                    summary.skipped_empty_alias += 1;
                    continue;
                }
                LocatedPrimary::Unparsable(process) => {
                    warn!(
                        "Skipping {}:{} in project {}: cannot derive cluster from alias '{}'",
                        process.hostname, process.port, project.id, process.alias
                    );
                    summary.skipped_unresolved += 1;
                    continue;
                }
            };

            let Some(cluster) = inventory.cluster(&key) else {
                warn!(
                    "Skipping {}:{} in project {}: no cluster named '{}'",
                    process.hostname, process.port, project.id, key
                );
                summary.skipped_unresolved += 1;
                continue;
            };

            debug!(
                "Primary {}:{} (alias {}, replica set {}, shard {})",
                process.hostname,
                process.port,
                process.alias,
                process.replica_set_name.as_deref().unwrap_or("-"),
                process.shard_name.as_deref().unwrap_or("-")
            );

            let stats = match fetch_process_stats(&self.provider, &project.id, process, window, &mut self.buckets).await {
                Ok(stats) => stats,
                Err(e) if e.is_metric_unsupported() => {
                    debug!("No oplog metrics for {}:{}: {}", process.hostname, process.port, e);
                    summary.skipped_metrics += 1;
                    continue;
                }
                Err(e) => {
                    warn!("Failed to fetch measurements for {}:{}: {}", process.hostname, process.port, e);
                    summary.skipped_metrics += 1;
                    continue;
                }
            };

            let row = ReportRow {
                project_id: project.id.clone(),
                project_name: project.name.clone(),
                cluster_id: cluster.id.clone(),
                cluster_name: cluster.name.clone(),
                oplog_size_mb: inventory.oplog_size_mb(&key),
                host: process.hostname.clone(),
                port: process.port,
                window: stats.window,
                rate: stats.rate,
            };
            self.writer.write_row(&row)?;
            summary.rows += 1;
        }

        Ok(())
    }
}
