//! Storage abstraction
//!
//! The core never owns a connection. Callers pass a [`MetricStore`] handle into
//! each ingestion run or query, scoped to that run or request.

mod sqlite;

pub use sqlite::{SqliteStore, STORAGE_TIME_FORMAT};

use crate::error::StoreError;
use crate::query::QuerySpec;
use crate::types::{CanonicalRecord, IngestionRun, MetricPoint, MetricSummary};
use async_trait::async_trait;

/// Time-series store reachable through a connection handle
#[async_trait]
pub trait MetricStore: Send + Sync {
    /// Verify the store is reachable
    async fn ping(&self) -> Result<(), StoreError>;

    /// Insert one batch atomically, ignoring rows whose
    /// `(timestamp, user_id, metric_type)` already exists
    ///
    /// Returns the number of rows actually created.
    async fn upsert_batch(&self, records: &[CanonicalRecord]) -> Result<u64, StoreError>;

    /// Append one provenance entry
    async fn record_run(&self, run: &IngestionRun) -> Result<(), StoreError>;

    /// Execute a tier query
    async fn fetch(&self, spec: &QuerySpec) -> Result<Vec<MetricPoint>, StoreError>;

    /// Distinct metric types stored for a user, most populous first
    async fn available_metrics(&self, user_id: &str) -> Result<Vec<MetricSummary>, StoreError>;
}
