//! Core types for the Synheart Store pipeline
//!
//! This module defines the data structures shared by normalization, ingestion
//! and querying: canonical records, run provenance, and query result rows.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

/// Scalar metadata value attached to a record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Scalar {
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

impl Scalar {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Scalar::Text(s) => Some(s.as_str()),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Scalar::Int(i) => Some(*i as f64),
            Scalar::Float(f) => Some(*f),
            _ => None,
        }
    }
}

impl From<&str> for Scalar {
    fn from(value: &str) -> Self {
        Scalar::Text(value.to_string())
    }
}

impl From<String> for Scalar {
    fn from(value: String) -> Self {
        Scalar::Text(value)
    }
}

impl From<f64> for Scalar {
    fn from(value: f64) -> Self {
        Scalar::Float(value)
    }
}

impl From<i64> for Scalar {
    fn from(value: i64) -> Self {
        Scalar::Int(value)
    }
}

/// Ordered metadata map carried by every record
pub type Metadata = BTreeMap<String, Scalar>;

/// Canonical time-series record - one observation regardless of source modality
///
/// `(timestamp, user_id, metric_type)` identifies the observation; storing the
/// same triple twice keeps the first write.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CanonicalRecord {
    /// Observation time (UTC)
    pub timestamp: DateTime<Utc>,
    /// Participant identifier
    pub user_id: String,
    /// Metric name, e.g. "heart_rate" or "hrv_rmssd"
    pub metric_type: String,
    /// Measured value, always finite
    pub value: f64,
    /// Resolution, priority and source tags
    pub metadata: Metadata,
}

impl CanonicalRecord {
    /// The natural dedup key of this record
    pub fn key(&self) -> (DateTime<Utc>, &str, &str) {
        (self.timestamp, &self.user_id, &self.metric_type)
    }
}

/// Provenance entry summarizing one ingestion run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IngestionRun {
    pub user_id: String,
    pub started_at: DateTime<Utc>,
    pub records_processed: u64,
    pub errors_encountered: u64,
    pub duration_seconds: f64,
}

/// Overall outcome of an ingestion run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    /// Every batch committed
    Completed,
    /// At least one batch failed; inspect `errors_encountered`
    CompletedWithErrors,
    /// Nothing to ingest
    Empty,
}

/// Result of a call to the batch ingestor
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunResult {
    pub run_id: Uuid,
    pub status: RunStatus,
    pub run: IngestionRun,
    pub batches_attempted: usize,
    pub batches_failed: usize,
    /// Rows actually created; duplicates of existing keys are not counted
    pub rows_inserted: u64,
    /// Whether the provenance row was written
    pub provenance_recorded: bool,
}

/// One row of a tiered query result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricPoint {
    pub timestamp: DateTime<Utc>,
    pub value: f64,
    pub metadata: Metadata,
}

/// Metric type available for a user with its stored row count
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricSummary {
    pub metric_type: String,
    pub record_count: i64,
}
