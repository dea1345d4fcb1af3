//! SQLite-backed metric store
//!
//! Raw samples live in `raw_data`, keyed by `(timestamp, user_id,
//! metric_type)`. The minute, hourly and daily tiers are views that bucket
//! `raw_data` and expose `avg_value`, `min_value`, `max_value` and `count`.
//! Timestamps are stored as UTC text in [`STORAGE_TIME_FORMAT`], so text order
//! is time order.

use crate::error::StoreError;
use crate::query::QuerySpec;
use crate::types::{CanonicalRecord, IngestionRun, Metadata, MetricPoint, MetricSummary};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions, SqliteRow};
use sqlx::{Row, SqlitePool};
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, info};

use super::MetricStore;

/// Text layout of every stored instant
///
/// Nanosecond width matches `DateTime<Utc>`, so distinct instants never share
/// a key. Bucket literals in the views use the same width to keep text
/// comparison consistent with time order.
pub const STORAGE_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.9f";

const SCHEMA: [&str; 6] = [
    r#"
    CREATE TABLE IF NOT EXISTS raw_data (
        timestamp TEXT NOT NULL,
        user_id TEXT NOT NULL,
        metric_type TEXT NOT NULL,
        value REAL NOT NULL,
        metadata TEXT NOT NULL DEFAULT '{}',
        PRIMARY KEY (timestamp, user_id, metric_type)
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS ingestion_log (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        user_id TEXT NOT NULL,
        last_ingestion_time TEXT NOT NULL,
        records_processed INTEGER NOT NULL,
        errors_encountered INTEGER NOT NULL,
        ingestion_duration_seconds REAL NOT NULL
    )
    "#,
    r#"
    CREATE INDEX IF NOT EXISTS idx_raw_data_user_metric_time
        ON raw_data (user_id, metric_type, timestamp)
    "#,
    r#"
    CREATE VIEW IF NOT EXISTS data_1m AS
    SELECT strftime('%Y-%m-%d %H:%M:00.000000000', timestamp) AS bucket,
           user_id, metric_type,
           AVG(value) AS avg_value, MIN(value) AS min_value, MAX(value) AS max_value,
           COUNT(*) AS count
    FROM raw_data
    GROUP BY bucket, user_id, metric_type
    "#,
    r#"
    CREATE VIEW IF NOT EXISTS data_1h AS
    SELECT strftime('%Y-%m-%d %H:00:00.000000000', timestamp) AS bucket,
           user_id, metric_type,
           AVG(value) AS avg_value, MIN(value) AS min_value, MAX(value) AS max_value,
           COUNT(*) AS count
    FROM raw_data
    GROUP BY bucket, user_id, metric_type
    "#,
    r#"
    CREATE VIEW IF NOT EXISTS data_1d AS
    SELECT strftime('%Y-%m-%d 00:00:00.000000000', timestamp) AS bucket,
           user_id, metric_type,
           AVG(value) AS avg_value, MIN(value) AS min_value, MAX(value) AS max_value,
           COUNT(*) AS count
    FROM raw_data
    GROUP BY bucket, user_id, metric_type
    "#,
];

/// Format an instant for storage or comparison
pub fn to_storage_time(ts: DateTime<Utc>) -> String {
    ts.format(STORAGE_TIME_FORMAT).to_string()
}

fn from_storage_time(raw: &str) -> Option<DateTime<Utc>> {
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%.f")
        .ok()
        .map(|naive| naive.and_utc())
}

/// Metric store over an SQLite connection pool
#[derive(Debug, Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Open (creating if needed) the database at `url` and ensure the schema
    pub async fn connect(url: &str, acquire_timeout: Duration) -> Result<Self, StoreError> {
        let options = SqliteConnectOptions::from_str(url)
            .map_err(|e| StoreError::Connectivity(format!("invalid database url {}: {}", url, e)))?
            .create_if_missing(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .acquire_timeout(acquire_timeout)
            .connect_with(options)
            .await
            .map_err(|e| StoreError::Connectivity(e.to_string()))?;

        info!(url, "connected to metric store");
        Self::with_pool(pool).await
    }

    /// Private in-memory database, mainly for tests and dry runs
    pub async fn in_memory() -> Result<Self, StoreError> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")
            .map_err(|e| StoreError::Connectivity(e.to_string()))?;

        // A single long-lived connection keeps the in-memory database alive
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await
            .map_err(|e| StoreError::Connectivity(e.to_string()))?;

        Self::with_pool(pool).await
    }

    /// Wrap an existing pool and ensure the schema
    pub async fn with_pool(pool: SqlitePool) -> Result<Self, StoreError> {
        let store = Self { pool };
        store.init_schema().await?;
        Ok(store)
    }

    async fn init_schema(&self) -> Result<(), StoreError> {
        for statement in SCHEMA {
            sqlx::query(statement).execute(&self.pool).await?;
        }
        debug!("metric store schema ready");
        Ok(())
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Close the pool, waiting for checked-out connections
    pub async fn close(self) {
        self.pool.close().await;
    }

    /// Number of rows in `raw_data`
    pub async fn raw_row_count(&self) -> Result<i64, StoreError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM raw_data")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    /// Provenance entries, oldest first
    pub async fn ingestion_runs(&self) -> Result<Vec<IngestionRun>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT user_id, last_ingestion_time, records_processed,
                   errors_encountered, ingestion_duration_seconds
            FROM ingestion_log
            ORDER BY id ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(decode_run).collect()
    }
}

fn encode_metadata(metadata: &Metadata) -> Result<String, StoreError> {
    serde_json::to_string(metadata).map_err(|e| StoreError::Encode(format!("metadata: {}", e)))
}

fn decode_error(e: sqlx::Error) -> StoreError {
    StoreError::Decode(e.to_string())
}

fn decode_run(row: &SqliteRow) -> Result<IngestionRun, StoreError> {
    let started: String = row.try_get("last_ingestion_time").map_err(decode_error)?;
    let started_at = from_storage_time(&started)
        .ok_or_else(|| StoreError::Decode(format!("bad ingestion time {}", started)))?;

    Ok(IngestionRun {
        user_id: row.try_get("user_id").map_err(decode_error)?,
        started_at,
        records_processed: row.try_get::<i64, _>("records_processed").map_err(decode_error)? as u64,
        errors_encountered: row.try_get::<i64, _>("errors_encountered").map_err(decode_error)? as u64,
        duration_seconds: row.try_get("ingestion_duration_seconds").map_err(decode_error)?,
    })
}

fn decode_point(row: &SqliteRow) -> Result<MetricPoint, StoreError> {
    let raw_ts: String = row.try_get("timestamp").map_err(decode_error)?;
    let timestamp = from_storage_time(&raw_ts)
        .ok_or_else(|| StoreError::Decode(format!("bad timestamp {}", raw_ts)))?;
    let value: f64 = row.try_get("value").map_err(decode_error)?;
    let raw_metadata: Option<String> = row.try_get("metadata").map_err(decode_error)?;
    let metadata = match raw_metadata {
        Some(text) => serde_json::from_str::<Metadata>(&text)
            .map_err(|e| StoreError::Decode(format!("bad metadata {}: {}", text, e)))?,
        None => Metadata::new(),
    };

    Ok(MetricPoint {
        timestamp,
        value,
        metadata,
    })
}

#[async_trait]
impl MetricStore for SqliteStore {
    async fn ping(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(|e| StoreError::Connectivity(e.to_string()))?;
        Ok(())
    }

    async fn upsert_batch(&self, records: &[CanonicalRecord]) -> Result<u64, StoreError> {
        let mut tx = self.pool.begin().await?;
        let mut inserted = 0;

        for record in records {
            let metadata = encode_metadata(&record.metadata)?;
            let result = sqlx::query(
                r#"
                INSERT INTO raw_data (timestamp, user_id, metric_type, value, metadata)
                VALUES (?, ?, ?, ?, ?)
                ON CONFLICT (timestamp, user_id, metric_type) DO NOTHING
                "#,
            )
            .bind(to_storage_time(record.timestamp))
            .bind(&record.user_id)
            .bind(&record.metric_type)
            .bind(record.value)
            .bind(metadata)
            .execute(&mut *tx)
            .await?;
            inserted += result.rows_affected();
        }

        // Dropping an uncommitted transaction rolls it back
        tx.commit().await?;
        Ok(inserted)
    }

    async fn record_run(&self, run: &IngestionRun) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO ingestion_log
                (user_id, last_ingestion_time, records_processed,
                 errors_encountered, ingestion_duration_seconds)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(&run.user_id)
        .bind(to_storage_time(run.started_at))
        .bind(run.records_processed as i64)
        .bind(run.errors_encountered as i64)
        .bind(run.duration_seconds)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn fetch(&self, spec: &QuerySpec) -> Result<Vec<MetricPoint>, StoreError> {
        let sql = spec.sql();
        debug!(tier = %spec.tier, %sql, "executing tier query");

        let rows = sqlx::query(&sql)
            .bind(&spec.user_id)
            .bind(&spec.metric_type)
            .bind(to_storage_time(spec.start))
            .bind(to_storage_time(spec.end))
            .bind(spec.limit as i64)
            .fetch_all(&self.pool)
            .await?;

        rows.iter().map(decode_point).collect()
    }

    async fn available_metrics(&self, user_id: &str) -> Result<Vec<MetricSummary>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT metric_type, COUNT(*) AS record_count
            FROM raw_data
            WHERE user_id = ?
            GROUP BY metric_type
            ORDER BY record_count DESC, metric_type ASC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| {
                Ok(MetricSummary {
                    metric_type: row.try_get("metric_type").map_err(decode_error)?,
                    record_count: row.try_get("record_count").map_err(decode_error)?,
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::QueryBuilder;
    use crate::tier::Tier;
    use crate::types::Scalar;
    use chrono::{Duration as ChronoDuration, TimeZone};

    fn sample(minute: u32, second: u32, value: f64) -> CanonicalRecord {
        let mut metadata = Metadata::new();
        metadata.insert("resolution".to_string(), Scalar::from("1_second"));
        CanonicalRecord {
            timestamp: Utc.with_ymd_and_hms(2024, 1, 15, 8, minute, second).unwrap(),
            user_id: "U1".to_string(),
            metric_type: "heart_rate".to_string(),
            value,
            metadata,
        }
    }

    #[test]
    fn test_storage_time_round_trip_keeps_order() {
        let a = Utc.with_ymd_and_hms(2024, 1, 15, 8, 0, 0).unwrap();
        let b = a + ChronoDuration::milliseconds(250);

        assert_eq!(to_storage_time(a), "2024-01-15 08:00:00.000000000");
        assert!(to_storage_time(a) < to_storage_time(b));
        assert_eq!(from_storage_time(&to_storage_time(b)), Some(b));
        assert_eq!(from_storage_time("2024-01-15 08:00:00"), Some(a));
    }

    #[tokio::test]
    async fn test_upsert_ignores_duplicate_keys() {
        let store = SqliteStore::in_memory().await.unwrap();
        let batch = vec![sample(0, 0, 70.0), sample(0, 1, 71.0)];

        assert_eq!(store.upsert_batch(&batch).await.unwrap(), 2);

        // Same keys, different values: first write wins
        let retry = vec![sample(0, 0, 99.0), sample(0, 1, 99.0), sample(0, 2, 72.0)];
        assert_eq!(store.upsert_batch(&retry).await.unwrap(), 1);
        assert_eq!(store.raw_row_count().await.unwrap(), 3);

        let start = Utc.with_ymd_and_hms(2024, 1, 15, 8, 0, 0).unwrap();
        let spec = QueryBuilder::build(Tier::Raw, "U1", "heart_rate", start, start + ChronoDuration::minutes(5), 10)
            .unwrap();
        let points = store.fetch(&spec).await.unwrap();
        let values: Vec<f64> = points.iter().map(|p| p.value).collect();
        assert_eq!(values, vec![70.0, 71.0, 72.0]);
        assert_eq!(points[0].metadata["resolution"].as_str(), Some("1_second"));
    }

    #[tokio::test]
    async fn test_sub_millisecond_instants_are_distinct_rows() {
        let store = SqliteStore::in_memory().await.unwrap();
        let base = Utc.with_ymd_and_hms(2024, 1, 15, 8, 0, 0).unwrap();
        let mut first = sample(0, 0, 70.0);
        first.timestamp = base + ChronoDuration::microseconds(100);
        let mut second = sample(0, 0, 99.0);
        second.timestamp = base + ChronoDuration::microseconds(200);
        assert_ne!(first.key(), second.key());

        assert_eq!(store.upsert_batch(&[first.clone(), second.clone()]).await.unwrap(), 2);
        assert_eq!(store.raw_row_count().await.unwrap(), 2);

        let spec = QueryBuilder::build(Tier::Raw, "U1", "heart_rate", base, base + ChronoDuration::minutes(1), 10)
            .unwrap();
        let points = store.fetch(&spec).await.unwrap();
        let stored: Vec<_> = points.iter().map(|p| (p.timestamp, p.value)).collect();
        assert_eq!(stored, vec![(first.timestamp, 70.0), (second.timestamp, 99.0)]);
    }

    #[test]
    fn test_metadata_encodes_as_json_object() {
        let record = sample(0, 0, 70.0);
        assert_eq!(
            encode_metadata(&record.metadata).unwrap(),
            r#"{"resolution":"1_second"}"#
        );
        assert_eq!(encode_metadata(&Metadata::new()).unwrap(), "{}");
    }

    #[tokio::test]
    async fn test_minute_tier_summarizes_bucket() {
        let store = SqliteStore::in_memory().await.unwrap();
        store
            .upsert_batch(&[sample(0, 0, 60.0), sample(0, 30, 80.0), sample(1, 0, 90.0)])
            .await
            .unwrap();

        let start = Utc.with_ymd_and_hms(2024, 1, 15, 8, 0, 0).unwrap();
        let spec = QueryBuilder::build(Tier::Minute, "U1", "heart_rate", start, start + ChronoDuration::hours(2), 10)
            .unwrap();
        let points = store.fetch(&spec).await.unwrap();

        assert_eq!(points.len(), 2);
        assert_eq!(points[0].timestamp, start);
        assert_eq!(points[0].value, 70.0);
        assert_eq!(points[0].metadata["min"].as_f64(), Some(60.0));
        assert_eq!(points[0].metadata["max"].as_f64(), Some(80.0));
        assert_eq!(points[0].metadata["count"], Scalar::Int(2));
        assert!(!points[0].metadata.contains_key("resolution"));
        assert_eq!(points[1].metadata["count"], Scalar::Int(1));
    }

    #[tokio::test]
    async fn test_limit_and_order() {
        let store = SqliteStore::in_memory().await.unwrap();
        store
            .upsert_batch(&[sample(2, 0, 3.0), sample(0, 0, 1.0), sample(1, 0, 2.0)])
            .await
            .unwrap();

        let start = Utc.with_ymd_and_hms(2024, 1, 15, 8, 0, 0).unwrap();
        let spec = QueryBuilder::build(Tier::Raw, "U1", "heart_rate", start, start + ChronoDuration::minutes(30), 2)
            .unwrap();
        let values: Vec<f64> = store.fetch(&spec).await.unwrap().iter().map(|p| p.value).collect();
        assert_eq!(values, vec![1.0, 2.0]);
    }

    #[tokio::test]
    async fn test_available_metrics() {
        let store = SqliteStore::in_memory().await.unwrap();
        let mut spo2 = sample(0, 0, 97.0);
        spo2.metric_type = "spo2".to_string();
        store
            .upsert_batch(&[sample(0, 0, 60.0), sample(0, 1, 61.0), spo2])
            .await
            .unwrap();

        let metrics = store.available_metrics("U1").await.unwrap();
        assert_eq!(
            metrics,
            vec![
                MetricSummary { metric_type: "heart_rate".to_string(), record_count: 2 },
                MetricSummary { metric_type: "spo2".to_string(), record_count: 1 },
            ]
        );
        assert!(store.available_metrics("nobody").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_record_run() {
        let store = SqliteStore::in_memory().await.unwrap();
        let run = IngestionRun {
            user_id: "U1".to_string(),
            started_at: Utc.with_ymd_and_hms(2024, 1, 15, 9, 0, 0).unwrap(),
            records_processed: 12,
            errors_encountered: 1,
            duration_seconds: 0.5,
        };
        store.record_run(&run).await.unwrap();

        assert_eq!(store.ingestion_runs().await.unwrap(), vec![run]);
    }

    #[tokio::test]
    async fn test_closed_pool_is_connectivity_error() {
        let store = SqliteStore::in_memory().await.unwrap();
        store.pool().close().await;
        assert!(matches!(store.ping().await, Err(StoreError::Connectivity(_))));
    }

    #[tokio::test]
    async fn test_file_database_is_created() {
        let dir = tempfile::tempdir().unwrap();
        let url = format!("sqlite://{}", dir.path().join("metrics.db").display());

        let store = SqliteStore::connect(&url, Duration::from_secs(5)).await.unwrap();
        store.ping().await.unwrap();
        store.close().await;

        assert!(dir.path().join("metrics.db").exists());
    }
}
