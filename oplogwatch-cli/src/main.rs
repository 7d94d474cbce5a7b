//! oplogwatch - Oplog health report for MongoDB Atlas
//!
//! Prints one CSV row per replica set primary visible to an Atlas API key,
//! with the minimum and average oplog window and the peak and average oplog
//! rate over the trailing day.

use std::fs::File;
use std::io::Write;
use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use tracing::{debug, info, Level};
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use oplogwatch::atlas::client::DEFAULT_BASE_URL;
use oplogwatch::atlas::{AtlasClient, AtlasConfig};
use oplogwatch::report::ReportWriter;
use oplogwatch::{Reporter, RunSettings, RunSummary};

#[derive(Parser, Debug)]
#[command(name = "oplogwatch")]
#[command(author = "Oplogwatch Team")]
#[command(version)]
#[command(about = "Oplog window and churn report for MongoDB Atlas primaries", long_about = None)]
struct Cli {
    /// Atlas programmatic API public key
    #[arg(long, env = "ATLAS_PUBLIC_KEY")]
    public_key: String,

    /// Atlas programmatic API private key
    #[arg(long, env = "ATLAS_PRIVATE_KEY", hide_env_values = true)]
    private_key: String,

    /// Atlas Admin API base URL
    #[arg(long, default_value = DEFAULT_BASE_URL, env = "ATLAS_BASE_URL")]
    base_url: String,

    /// Items per page when listing projects, clusters and processes
    #[arg(long, default_value = "50", env = "OPLOGWATCH_PAGE_SIZE", value_parser = clap::value_parser!(u32).range(1..=500))]
    page_size: u32,

    /// Length of the trailing measurement window in hours
    #[arg(long, default_value = "24", env = "OPLOGWATCH_WINDOW_HOURS", value_parser = clap::value_parser!(u32).range(1..))]
    window_hours: u32,

    /// Request timeout in seconds
    #[arg(long, default_value = "30", env = "OPLOGWATCH_TIMEOUT_SECS")]
    timeout: u64,

    /// Write the report to a file instead of stdout
    #[arg(short, long, env = "OPLOGWATCH_OUTPUT")]
    output: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging on stderr; stdout carries the report
    let log_level = match cli.verbose {
        0 => Level::INFO,
        1 => Level::DEBUG,
        _ => Level::TRACE,
    };

    let filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::from_level(log_level).into())
        .from_env_lossy();

    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let client = AtlasClient::new(AtlasConfig {
        base_url: cli.base_url.clone(),
        public_key: cli.public_key.clone(),
        private_key: cli.private_key.clone(),
        page_size: cli.page_size,
        timeout_secs: cli.timeout,
    })?;

    let settings = RunSettings {
        page_size: cli.page_size,
        window_hours: cli.window_hours,
    };

    info!("Atlas API: {}", cli.base_url);

    let summary = match &cli.output {
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("Failed to create report file {}", path.display()))?;
            run_report(client, file, settings).await?
        }
        None => run_report(client, std::io::stdout(), settings).await?,
    };

    info!(
        "Report complete: {} projects, {} primaries, {} rows ({} without alias, {} unresolved, {} without metrics)",
        summary.projects,
        summary.primaries,
        summary.rows,
        summary.skipped_empty_alias,
        summary.skipped_unresolved,
        summary.skipped_metrics,
    );

    Ok(())
}

async fn run_report<W: Write>(client: AtlasClient, out: W, settings: RunSettings) -> anyhow::Result<RunSummary> {
    let mut reporter = Reporter::new(client, ReportWriter::new(out), settings);
    let summary = reporter.run(chrono::Utc::now()).await?;

    let buckets = reporter.hour_buckets();
    debug!(
        "Distinct hours observed: {} oplog window, {} oplog rate",
        buckets.window_hours().len(),
        buckets.rate_hours().len()
    );

    Ok(summary)
}
