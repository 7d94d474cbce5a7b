//! CSV report rows
//!
//! One row per primary, in the order primaries are encountered. Hour values
//! carry 2 decimals, rates 6; a statistics bundle with no samples renders its
//! three columns empty.

use std::io::Write;

use csv::{QuoteStyle, Terminator, WriterBuilder};

use crate::metrics::{RateStats, WindowStats};

/// Header line; the odd leading spaces are part of the established format
pub const HEADER: [&str; 13] = [
    "Project ID",
    "Project Name",
    "Cluster ID",
    " Cluster Name",
    "Oplog Size (MB)",
    "Primary Host",
    "Port",
    "Min Window (hrs)",
    " Min Hour (Z)",
    " Avg Window (hrs)",
    " Max Rate (GB / hr)",
    " Max Hour (Z)",
    " Avg Rate (GB / hr)",
];

/// One report line
#[derive(Debug, Clone, PartialEq)]
pub struct ReportRow {
    pub project_id: String,
    pub project_name: String,
    pub cluster_id: String,
    pub cluster_name: String,
    pub oplog_size_mb: Option<i64>,
    pub host: String,
    pub port: u16,
    pub window: WindowStats,
    pub rate: RateStats,
}

impl ReportRow {
    /// Rendered fields in header order
    pub fn fields(&self) -> [String; 13] {
        let (min_window, min_hour, avg_window) = window_fields(&self.window);
        let (max_rate, max_hour, avg_rate) = rate_fields(&self.rate);

        [
            self.project_id.clone(),
            self.project_name.clone(),
            self.cluster_id.clone(),
            self.cluster_name.clone(),
            oplog_size_field(self.oplog_size_mb),
            self.host.clone(),
            self.port.to_string(),
            min_window,
            min_hour,
            avg_window,
            max_rate,
            max_hour,
            avg_rate,
        ]
    }
}

/// Unset and non-positive sizes render empty
fn oplog_size_field(size: Option<i64>) -> String {
    match size {
        Some(mb) if mb > 0 => mb.to_string(),
        _ => String::new(),
    }
}

fn window_fields(stats: &WindowStats) -> (String, String, String) {
    if stats.count == 0 {
        return (String::new(), String::new(), String::new());
    }
    (
        stats.min_hours().map(|v| format!("{:.2}", v)).unwrap_or_default(),
        stats.min_hour().unwrap_or_default().to_string(),
        stats.average_hours().map(|v| format!("{:.2}", v)).unwrap_or_default(),
    )
}

fn rate_fields(stats: &RateStats) -> (String, String, String) {
    if stats.count == 0 {
        return (String::new(), String::new(), String::new());
    }
    (
        stats.max().map(|v| format!("{:.6}", v)).unwrap_or_default(),
        stats.max_hour().unwrap_or_default().to_string(),
        stats.average().map(|v| format!("{:.6}", v)).unwrap_or_default(),
    )
}

/// Line-buffered CSV writer for report rows
pub struct ReportWriter<W: Write> {
    inner: csv::Writer<W>,
}

impl<W: Write> ReportWriter<W> {
    pub fn new(writer: W) -> Self {
        let inner = WriterBuilder::new()
            .has_headers(false)
            .quote_style(QuoteStyle::Necessary)
            .terminator(Terminator::Any(b'\n'))
            .from_writer(writer);
        Self { inner }
    }

    pub fn write_header(&mut self) -> Result<(), csv::Error> {
        self.inner.write_record(HEADER)?;
        self.inner.flush()?;
        Ok(())
    }

    pub fn write_row(&mut self, row: &ReportRow) -> Result<(), csv::Error> {
        self.inner.write_record(row.fields())?;
        self.inner.flush()?;
        Ok(())
    }
}
