//! Process measurement types
//!
//! Time series returned by the Atlas measurements endpoint and the query
//! used to request them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Hourly bucket width, as an ISO-8601 duration
pub const GRANULARITY_ONE_HOUR: &str = "PT1H";

/// Measurement names the report requests
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MetricName {
    /// Oplog window in seconds
    #[serde(rename = "OPLOG_MASTER_TIME")]
    OplogMasterTime,
    /// Oplog churn in GB per hour
    #[serde(rename = "OPLOG_RATE_GB_PER_HOUR")]
    OplogRateGbPerHour,
}

impl MetricName {
    pub fn as_str(&self) -> &'static str {
        match self {
            MetricName::OplogMasterTime => "OPLOG_MASTER_TIME",
            MetricName::OplogRateGbPerHour => "OPLOG_RATE_GB_PER_HOUR",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "OPLOG_MASTER_TIME" => Some(MetricName::OplogMasterTime),
            "OPLOG_RATE_GB_PER_HOUR" => Some(MetricName::OplogRateGbPerHour),
            _ => None,
        }
    }
}

impl std::fmt::Display for MetricName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single timestamped sample; `value` is null when the bucket has no data
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataPoint {
    pub timestamp: String,
    pub value: Option<f64>,
}

impl DataPoint {
    pub fn new(timestamp: impl Into<String>, value: Option<f64>) -> Self {
        Self {
            timestamp: timestamp.into(),
            value,
        }
    }

    /// Date-and-hour prefix of the timestamp, e.g. `2021-08-19T18`
    pub fn hour_bucket(&self) -> &str {
        hour_bucket(&self.timestamp)
    }
}

/// A named series of samples for one process
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeasurementSeries {
    pub name: String,
    #[serde(default)]
    pub units: Option<String>,
    pub data_points: Vec<DataPoint>,
}

impl MeasurementSeries {
    pub fn new(name: impl Into<String>, data_points: Vec<DataPoint>) -> Self {
        Self {
            name: name.into(),
            units: None,
            data_points,
        }
    }

    pub fn metric(&self) -> Option<MetricName> {
        MetricName::from_name(&self.name)
    }
}

/// Parameters of a measurements request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeasurementQuery {
    pub granularity: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub metrics: Vec<MetricName>,
}

/// Timestamps are rendered on whole hours, `2021-08-19T18:00:00Z`
pub fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.format("%Y-%m-%dT%H:%M:%SZ").to_string()
}

/// First 13 characters of an ISO-8601 timestamp (date plus hour)
pub fn hour_bucket(timestamp: &str) -> &str {
    timestamp.get(..13).unwrap_or(timestamp)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_hour_bucket() {
        assert_eq!(hour_bucket("2021-08-19T18:00:00Z"), "2021-08-19T18");
        assert_eq!(hour_bucket("2021-08-19"), "2021-08-19");
        assert_eq!(DataPoint::new("2021-08-19T05:00:00Z", None).hour_bucket(), "2021-08-19T05");
    }

    #[test]
    fn test_metric_names() {
        for metric in [MetricName::OplogMasterTime, MetricName::OplogRateGbPerHour] {
            assert_eq!(MetricName::from_name(metric.as_str()), Some(metric));
        }
        assert_eq!(MetricName::from_name("CONNECTIONS"), None);
        assert_eq!(
            serde_json::to_string(&MetricName::OplogRateGbPerHour).unwrap(),
            "\"OPLOG_RATE_GB_PER_HOUR\""
        );
    }

    #[test]
    fn test_format_timestamp() {
        let ts = Utc.with_ymd_and_hms(2021, 8, 19, 18, 0, 0).unwrap();
        assert_eq!(format_timestamp(&ts), "2021-08-19T18:00:00Z");
    }
}
