//! Report Pipeline Tests
//!
//! These tests drive a complete report run against an in-memory Atlas
//! inventory and check the CSV that comes out.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use oplogwatch::atlas::{ApiError, InventoryProvider};
use oplogwatch::report::ReportWriter;
use oplogwatch::{ReportError, Reporter, RunSettings, RunSummary};
use oplogwatch_shared::{
    Cluster, DataPoint, MeasurementQuery, MeasurementSeries, Page, Process, ProcessRole, Project,
};

const HEADER: &str = "Project ID,Project Name,Cluster ID, Cluster Name,Oplog Size (MB),Primary Host,Port,Min Window (hrs), Min Hour (Z), Avg Window (hrs), Max Rate (GB / hr), Max Hour (Z), Avg Rate (GB / hr)";

#[derive(Clone, Copy)]
enum Failure {
    MetricUnsupported,
    Network,
}

impl Failure {
    fn to_error(self) -> ApiError {
        match self {
            Failure::MetricUnsupported => ApiError::MetricUnsupported("Invalid metric name OPLOG_MASTER_TIME.".into()),
            Failure::Network => ApiError::Network("Connection refused".into()),
        }
    }
}

fn upstream_error() -> ApiError {
    ApiError::Status {
        status: 500,
        code: "UNEXPECTED_ERROR".into(),
        detail: "Unexpected error.".into(),
    }
}

/// In-memory Atlas inventory
#[derive(Default)]
struct FakeAtlas {
    projects: Vec<Project>,
    clusters: HashMap<String, Vec<Cluster>>,
    oplog_sizes: HashMap<(String, String), i64>,
    processes: HashMap<String, Vec<Process>>,
    measurements: HashMap<(String, u16), Vec<MeasurementSeries>>,
    measurement_failures: HashMap<(String, u16), Failure>,
    failing_project_pages: HashSet<u32>,
    failing_cluster_listings: HashSet<String>,
    failing_oplog_configs: HashSet<(String, String)>,
    failing_process_listings: HashSet<String>,

    project_pages: Mutex<Vec<u32>>,
    queries: Mutex<Vec<MeasurementQuery>>,
}

impl FakeAtlas {
    fn project(mut self, id: &str, name: &str) -> Self {
        self.projects.push(Project::new(id, name));
        self
    }

    fn cluster(mut self, project_id: &str, id: &str, name: &str, oplog_size_mb: Option<i64>) -> Self {
        self.clusters
            .entry(project_id.to_string())
            .or_default()
            .push(Cluster::new(id, name));
        if let Some(size) = oplog_size_mb {
            self.oplog_sizes.insert((project_id.to_string(), name.to_string()), size);
        }
        self
    }

    fn process(mut self, project_id: &str, host: &str, role: ProcessRole, alias: &str) -> Self {
        self.processes
            .entry(project_id.to_string())
            .or_default()
            .push(Process::new(host, 27017, role, alias));
        self
    }

    fn series(mut self, host: &str, name: &str, points: &[(&str, Option<f64>)]) -> Self {
        let points = points.iter().map(|(ts, v)| DataPoint::new(*ts, *v)).collect();
        self.measurements
            .entry((host.to_string(), 27017))
            .or_default()
            .push(MeasurementSeries::new(name, points));
        self
    }

    fn failing_measurements(mut self, host: &str, failure: Failure) -> Self {
        self.measurement_failures.insert((host.to_string(), 27017), failure);
        self
    }

    fn failing_project_page(mut self, page_num: u32) -> Self {
        self.failing_project_pages.insert(page_num);
        self
    }

    fn failing_clusters(mut self, project_id: &str) -> Self {
        self.failing_cluster_listings.insert(project_id.to_string());
        self
    }

    fn failing_oplog_config(mut self, project_id: &str, cluster_name: &str) -> Self {
        self.failing_oplog_configs
            .insert((project_id.to_string(), cluster_name.to_string()));
        self
    }

    fn failing_processes(mut self, project_id: &str) -> Self {
        self.failing_process_listings.insert(project_id.to_string());
        self
    }
}

#[async_trait]
impl InventoryProvider for FakeAtlas {
    async fn list_projects(&self, page_num: u32, items_per_page: u32) -> Result<Page<Project>, ApiError> {
        self.project_pages.lock().unwrap().push(page_num);
        if self.failing_project_pages.contains(&page_num) {
            return Err(upstream_error());
        }

        let start = ((page_num - 1) * items_per_page) as usize;
        let results = self
            .projects
            .iter()
            .skip(start)
            .take(items_per_page as usize)
            .cloned()
            .collect();
        Ok(Page::new(results, self.projects.len() as u64))
    }

    async fn list_clusters(&self, project_id: &str) -> Result<Vec<Cluster>, ApiError> {
        if self.failing_cluster_listings.contains(project_id) {
            return Err(upstream_error());
        }
        Ok(self.clusters.get(project_id).cloned().unwrap_or_default())
    }

    async fn get_oplog_size_mb(&self, project_id: &str, cluster_name: &str) -> Result<Option<i64>, ApiError> {
        let key = (project_id.to_string(), cluster_name.to_string());
        if self.failing_oplog_configs.contains(&key) {
            return Err(upstream_error());
        }
        Ok(self.oplog_sizes.get(&key).copied())
    }

    async fn list_processes(&self, project_id: &str) -> Result<Vec<Process>, ApiError> {
        if self.failing_process_listings.contains(project_id) {
            return Err(upstream_error());
        }
        Ok(self.processes.get(project_id).cloned().unwrap_or_default())
    }

    async fn get_measurements(
        &self,
        _project_id: &str,
        host: &str,
        port: u16,
        query: &MeasurementQuery,
    ) -> Result<Vec<MeasurementSeries>, ApiError> {
        self.queries.lock().unwrap().push(query.clone());

        let key = (host.to_string(), port);
        if let Some(failure) = self.measurement_failures.get(&key) {
            return Err(failure.to_error());
        }
        Ok(self.measurements.get(&key).cloned().unwrap_or_default())
    }
}

struct RunOutput {
    result: Result<RunSummary, ReportError>,
    csv: String,
    project_pages: Vec<u32>,
    queries: Vec<MeasurementQuery>,
}

impl RunOutput {
    fn rows(&self) -> Vec<&str> {
        self.csv.lines().skip(1).collect()
    }
}

fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2021, 8, 20, 0, 15, 42).unwrap()
}

async fn run_report(fake: FakeAtlas, page_size: u32) -> RunOutput {
    let mut out = Vec::new();
    let (result, project_pages, queries) = {
        let settings = RunSettings {
            page_size,
            ..Default::default()
        };
        let mut reporter = Reporter::new(fake, ReportWriter::new(&mut out), settings);
        let result = reporter.run(now()).await;
        let pages = reporter.provider().project_pages.lock().unwrap().clone();
        let queries = reporter.provider().queries.lock().unwrap().clone();
        (result, pages, queries)
    };

    RunOutput {
        result,
        csv: String::from_utf8(out).unwrap(),
        project_pages,
        queries,
    }
}

// =============================================================================
// Row content
// =============================================================================

#[tokio::test]
async fn test_single_primary_end_to_end() {
    let fake = FakeAtlas::default()
        .project("p1", "Payments")
        .cluster("p1", "c1", "Cluster0", Some(2048))
        .process("p1", "host0", ProcessRole::Primary, "cluster0-shard-00-00")
        .series("host0", "OPLOG_MASTER_TIME", &[("2021-08-19T01:00:00Z", Some(3600.0)), ("2021-08-19T02:00:00Z", Some(7200.0))])
        .series("host0", "OPLOG_RATE_GB_PER_HOUR", &[("2021-08-19T01:00:00Z", Some(0.5)), ("2021-08-19T02:00:00Z", Some(1.5))]);

    let output = run_report(fake, 50).await;
    let summary = output.result.as_ref().unwrap();

    assert_eq!(output.csv.lines().next(), Some(HEADER));
    assert_eq!(
        output.rows(),
        vec!["p1,Payments,c1,Cluster0,2048,host0,27017,1.00,2021-08-19T01,1.50,1.500000,2021-08-19T02,1.000000"]
    );
    assert_eq!(summary.projects, 1);
    assert_eq!(summary.primaries, 1);
    assert_eq!(summary.rows, 1);
}

#[tokio::test]
async fn test_process_without_samples_renders_blank_stats() {
    let fake = FakeAtlas::default()
        .project("p1", "Payments")
        .cluster("p1", "c1", "Cluster0", None)
        .process("p1", "host0", ProcessRole::Primary, "Cluster0-shard-00-00")
        .series("host0", "OPLOG_MASTER_TIME", &[("2021-08-19T01:00:00Z", None)]);

    let output = run_report(fake, 50).await;

    assert!(output.result.is_ok());
    assert_eq!(output.rows(), vec!["p1,Payments,c1,Cluster0,,host0,27017,,,,,,"]);
}

#[tokio::test]
async fn test_join_ignores_case_and_secondaries() {
    let fake = FakeAtlas::default()
        .project("p1", "Payments")
        .cluster("p1", "c1", "Prod-Cluster", Some(990))
        .process("p1", "sec0", ProcessRole::Secondary, "prod-cluster-shard-00-00")
        .process("p1", "pri0", ProcessRole::Primary, "prod-cluster-shard-00-01")
        .process("p1", "mongos0", ProcessRole::Other, "prod-cluster-mongos-00");

    let output = run_report(fake, 50).await;
    let summary = output.result.as_ref().unwrap();

    assert_eq!(output.rows(), vec!["p1,Payments,c1,Prod-Cluster,990,pri0,27017,,,,,,"]);
    assert_eq!(summary.primaries, 1);
    assert_eq!(output.queries.len(), 1);
}

// =============================================================================
// Skips
// =============================================================================

#[tokio::test]
async fn test_empty_alias_is_skipped_silently() {
    let fake = FakeAtlas::default()
        .project("p1", "Payments")
        .cluster("p1", "c1", "Cluster0", Some(2048))
        .process("p1", "host0", ProcessRole::Primary, "");

    let output = run_report(fake, 50).await;
    let summary = output.result.as_ref().unwrap();

    assert!(output.rows().is_empty());
    assert_eq!(summary.skipped_empty_alias, 1);
    assert!(output.queries.is_empty());
}

#[tokio::test]
async fn test_unresolved_cluster_is_skipped() {
    let fake = FakeAtlas::default()
        .project("p1", "Payments")
        .cluster("p1", "c1", "Cluster0", Some(2048))
        .process("p1", "gone0", ProcessRole::Primary, "deleted-shard-00-00")
        .process("p1", "odd0", ProcessRole::Primary, "no-delimiter-here")
        .process("p1", "host0", ProcessRole::Primary, "cluster0-shard-00-00");

    let output = run_report(fake, 50).await;
    let summary = output.result.as_ref().unwrap();

    assert_eq!(output.rows(), vec!["p1,Payments,c1,Cluster0,2048,host0,27017,,,,,,"]);
    assert_eq!(summary.skipped_unresolved, 2);
    assert_eq!(summary.rows, 1);
}

#[tokio::test]
async fn test_measurement_failures_only_drop_their_row() {
    let fake = FakeAtlas::default()
        .project("p1", "Payments")
        .cluster("p1", "c1", "free0", None)
        .cluster("p1", "c2", "flaky0", None)
        .cluster("p1", "c3", "good0", Some(4096))
        .process("p1", "free-host", ProcessRole::Primary, "free0-shard-00-00")
        .process("p1", "flaky-host", ProcessRole::Primary, "flaky0-shard-00-00")
        .process("p1", "good-host", ProcessRole::Primary, "good0-shard-00-00")
        .failing_measurements("free-host", Failure::MetricUnsupported)
        .failing_measurements("flaky-host", Failure::Network)
        .series("good-host", "OPLOG_RATE_GB_PER_HOUR", &[("2021-08-19T05:00:00Z", Some(1.234567))]);

    let output = run_report(fake, 50).await;
    let summary = output.result.as_ref().unwrap();

    assert_eq!(
        output.rows(),
        vec!["p1,Payments,c3,good0,4096,good-host,27017,,,,1.234567,2021-08-19T05,1.234567"]
    );
    assert_eq!(summary.skipped_metrics, 2);
    assert_eq!(summary.primaries, 3);
}

// =============================================================================
// Traversal
// =============================================================================

#[tokio::test]
async fn test_projects_are_paged_and_rows_keep_order() {
    let mut fake = FakeAtlas::default();
    for n in 1..=5 {
        let project = format!("p{}", n);
        let host = format!("host{}", n);
        fake = fake
            .project(&project, &format!("Project {}", n))
            .cluster(&project, &format!("c{}", n), "Cluster0", Some(1024))
            .process(&project, &host, ProcessRole::Primary, "cluster0-shard-00-00");
    }

    let output = run_report(fake, 2).await;
    let summary = output.result.as_ref().unwrap();

    assert_eq!(output.project_pages, vec![1, 2, 3]);
    assert_eq!(summary.projects, 5);

    let hosts: Vec<&str> = output.rows().iter().map(|row| row.split(',').nth(5).unwrap()).collect();
    assert_eq!(hosts, vec!["host1", "host2", "host3", "host4", "host5"]);
}

#[tokio::test]
async fn test_cluster_listing_failure_aborts_after_earlier_rows() {
    let fake = FakeAtlas::default()
        .project("p1", "First")
        .project("p2", "Second")
        .project("p3", "Third")
        .cluster("p1", "c1", "Cluster0", None)
        .process("p1", "host1", ProcessRole::Primary, "cluster0-shard-00-00")
        .cluster("p3", "c3", "Cluster0", None)
        .process("p3", "host3", ProcessRole::Primary, "cluster0-shard-00-00")
        .failing_clusters("p2");

    let output = run_report(fake, 50).await;

    match output.result {
        Err(ReportError::ListClusters { ref project_id, .. }) => assert_eq!(project_id, "p2"),
        ref other => panic!("expected cluster listing failure, got {:?}", other),
    }
    assert_eq!(output.rows(), vec!["p1,First,c1,Cluster0,,host1,27017,,,,,,"]);
}

/// Two projects with one reportable primary each
fn two_projects() -> FakeAtlas {
    FakeAtlas::default()
        .project("p1", "First")
        .project("p2", "Second")
        .cluster("p1", "c1", "Cluster0", None)
        .process("p1", "host1", ProcessRole::Primary, "cluster0-shard-00-00")
        .cluster("p2", "c2", "Cluster0", None)
        .process("p2", "host2", ProcessRole::Primary, "cluster0-shard-00-00")
}

#[tokio::test]
async fn test_project_page_failure_aborts_after_earlier_rows() {
    let output = run_report(two_projects().failing_project_page(2), 1).await;

    match output.result {
        Err(ReportError::ListProjects { page, .. }) => assert_eq!(page, 2),
        ref other => panic!("expected project listing failure, got {:?}", other),
    }
    assert_eq!(output.project_pages, vec![1, 2]);
    assert_eq!(output.rows(), vec!["p1,First,c1,Cluster0,,host1,27017,,,,,,"]);
}

#[tokio::test]
async fn test_oplog_config_failure_aborts_after_earlier_rows() {
    let output = run_report(two_projects().failing_oplog_config("p2", "Cluster0"), 50).await;

    match output.result {
        Err(ReportError::OplogConfig {
            ref project_id,
            ref cluster,
            ..
        }) => {
            assert_eq!(project_id, "p2");
            assert_eq!(cluster, "Cluster0");
        }
        ref other => panic!("expected oplog config failure, got {:?}", other),
    }
    assert_eq!(output.rows(), vec!["p1,First,c1,Cluster0,,host1,27017,,,,,,"]);
}

#[tokio::test]
async fn test_process_listing_failure_aborts_after_earlier_rows() {
    let output = run_report(two_projects().failing_processes("p2"), 50).await;

    match output.result {
        Err(ReportError::ListProcesses { ref project_id, .. }) => assert_eq!(project_id, "p2"),
        ref other => panic!("expected process listing failure, got {:?}", other),
    }
    assert_eq!(output.rows(), vec!["p1,First,c1,Cluster0,,host1,27017,,,,,,"]);
    assert_eq!(output.queries.len(), 1);
}

#[tokio::test]
async fn test_measurement_window_is_fixed_for_run() {
    let fake = FakeAtlas::default()
        .project("p1", "Payments")
        .cluster("p1", "c1", "Cluster0", None)
        .process("p1", "host0", ProcessRole::Primary, "cluster0-shard-00-00")
        .process("p1", "host1", ProcessRole::Primary, "cluster0-shard-00-01");

    let output = run_report(fake, 50).await;

    assert_eq!(output.queries.len(), 2);
    for query in &output.queries {
        assert_eq!(query.granularity, "PT1H");
        assert_eq!(query.start, Utc.with_ymd_and_hms(2021, 8, 19, 0, 0, 0).unwrap());
        assert_eq!(query.end, Utc.with_ymd_and_hms(2021, 8, 20, 0, 0, 0).unwrap());
    }
}
