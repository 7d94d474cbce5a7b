//! Oplog metric aggregation
//!
//! Requests the oplog window and oplog rate series for a primary over a
//! trailing window of whole hours and reduces each in a single pass:
//! - Null samples are dropped before anything else
//! - Window: running sum and count, minimum with the hour it first occurred
//! - Rate: running sum and count, maximum with the hour it first occurred

use std::collections::BTreeSet;

use chrono::{DateTime, DurationRound, TimeDelta, Utc};
use oplogwatch_shared::{MeasurementQuery, MeasurementSeries, MetricName, Process, GRANULARITY_ONE_HOUR};
use tracing::trace;

use crate::atlas::{ApiError, InventoryProvider};

const SECONDS_PER_HOUR: f64 = 3600.0;

/// Trailing window ending on the most recent top of the hour
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MeasurementWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl MeasurementWindow {
    pub fn trailing_hours(now: DateTime<Utc>, hours: u32) -> Self {
        let end = now.duration_trunc(TimeDelta::hours(1)).unwrap_or(now);
        Self {
            start: end - TimeDelta::hours(i64::from(hours)),
            end,
        }
    }

    /// Hourly query for both oplog series over this window
    pub fn query(&self) -> MeasurementQuery {
        MeasurementQuery {
            granularity: GRANULARITY_ONE_HOUR.to_string(),
            start: self.start,
            end: self.end,
            metrics: vec![MetricName::OplogMasterTime, MetricName::OplogRateGbPerHour],
        }
    }
}

/// Distinct hour buckets observed across a whole run.
///
/// Write-only bookkeeping: nothing in the report reads it back. The sizes
/// are logged at the end of a run.
#[derive(Debug, Clone, Default)]
pub struct HourBuckets {
    window_hours: BTreeSet<String>,
    rate_hours: BTreeSet<String>,
}

impl HourBuckets {
    pub fn record(&mut self, metric: MetricName, hour: &str) {
        let set = match metric {
            MetricName::OplogMasterTime => &mut self.window_hours,
            MetricName::OplogRateGbPerHour => &mut self.rate_hours,
        };
        if !set.contains(hour) {
            set.insert(hour.to_string());
        }
    }

    pub fn window_hours(&self) -> &BTreeSet<String> {
        &self.window_hours
    }

    pub fn rate_hours(&self) -> &BTreeSet<String> {
        &self.rate_hours
    }
}

/// Oplog window statistics, values in seconds
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WindowStats {
    pub count: u32,
    total: f64,
    min: Option<(f64, String)>,
}

impl WindowStats {
    pub fn observe(&mut self, seconds: f64, hour: &str) {
        self.count += 1;
        self.total += seconds;
        if self.min.as_ref().map_or(true, |(min, _)| seconds < *min) {
            self.min = Some((seconds, hour.to_string()));
        }
    }

    pub fn min_hours(&self) -> Option<f64> {
        self.min.as_ref().map(|(min, _)| min / SECONDS_PER_HOUR)
    }

    /// Hour bucket of the first occurrence of the minimum
    pub fn min_hour(&self) -> Option<&str> {
        self.min.as_ref().map(|(_, hour)| hour.as_str())
    }

    pub fn average_hours(&self) -> Option<f64> {
        (self.count > 0).then(|| self.total / f64::from(self.count) / SECONDS_PER_HOUR)
    }
}

/// Oplog rate statistics, values in GB/hour
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RateStats {
    pub count: u32,
    total: f64,
    max: Option<(f64, String)>,
}

impl RateStats {
    pub fn observe(&mut self, gb_per_hour: f64, hour: &str) {
        self.count += 1;
        self.total += gb_per_hour;
        if self.max.as_ref().map_or(true, |(max, _)| gb_per_hour > *max) {
            self.max = Some((gb_per_hour, hour.to_string()));
        }
    }

    pub fn max(&self) -> Option<f64> {
        self.max.as_ref().map(|(max, _)| *max)
    }

    /// Hour bucket of the first occurrence of the maximum
    pub fn max_hour(&self) -> Option<&str> {
        self.max.as_ref().map(|(_, hour)| hour.as_str())
    }

    pub fn average(&self) -> Option<f64> {
        (self.count > 0).then(|| self.total / f64::from(self.count))
    }
}

/// Both statistic bundles for one process
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProcessStats {
    pub window: WindowStats,
    pub rate: RateStats,
}

/// Reduce the returned series. Series with other names are ignored.
pub fn aggregate(series: &[MeasurementSeries], buckets: &mut HourBuckets) -> ProcessStats {
    let mut stats = ProcessStats::default();

    for s in series {
        let Some(metric) = s.metric() else {
            trace!("Ignoring measurement {}", s.name);
            continue;
        };

        for point in &s.data_points {
            let Some(value) = point.value else { continue };
            let hour = point.hour_bucket();
            trace!("{} {} {}", metric, point.timestamp, value);

            buckets.record(metric, hour);
            match metric {
                MetricName::OplogMasterTime => stats.window.observe(value, hour),
                MetricName::OplogRateGbPerHour => stats.rate.observe(value, hour),
            }
        }
    }

    stats
}

/// Fetch and reduce the oplog series of one primary
pub async fn fetch_process_stats<P>(
    provider: &P,
    project_id: &str,
    process: &Process,
    window: &MeasurementWindow,
    buckets: &mut HourBuckets,
) -> Result<ProcessStats, ApiError>
where
    P: InventoryProvider + ?Sized,
{
    let series = provider
        .get_measurements(project_id, &process.hostname, process.port, &window.query())
        .await?;
    Ok(aggregate(&series, buckets))
}
