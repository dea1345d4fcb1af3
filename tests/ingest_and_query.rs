//! End-to-end: ingestion document in, tiered query results out

use chrono::{TimeZone, Utc};
use pretty_assertions::assert_eq;
use synheart_store::query::DEFAULT_LIMIT;
use synheart_store::types::{Metadata, Scalar};
use synheart_store::{
    ingest_json, query_metrics, CanonicalRecord, MetricNormalizer, MetricsQuery, RunStatus,
    SqliteStore, Tier,
};

const SINGLE_READING: &str = r#"{
    "heart_rate": {
        "intraday_data": [
            {"timestamp": "2024-01-15T08:00:00Z", "participant_id": "U1",
             "metric_type": "heart_rate", "value": "72"}
        ]
    }
}"#;

fn expected_record() -> CanonicalRecord {
    let mut metadata = Metadata::new();
    metadata.insert("resolution".to_string(), Scalar::from("1_second"));
    metadata.insert("priority".to_string(), Scalar::from("high"));
    metadata.insert("source".to_string(), Scalar::from("clinical_trial"));
    CanonicalRecord {
        timestamp: Utc.with_ymd_and_hms(2024, 1, 15, 8, 0, 0).unwrap(),
        user_id: "U1".to_string(),
        metric_type: "heart_rate".to_string(),
        value: 72.0,
        metadata,
    }
}

#[test]
fn single_reading_normalizes_to_one_record() {
    let outcome = MetricNormalizer::new().normalize_json(SINGLE_READING).unwrap();
    assert_eq!(outcome.records, vec![expected_record()]);
    assert_eq!(outcome.skipped, 0);
}

#[tokio::test]
async fn single_reading_round_trips_through_store() {
    let store = SqliteStore::in_memory().await.unwrap();

    let report = ingest_json(&store, SINGLE_READING).await.unwrap();
    assert_eq!(report.ingestion.status, RunStatus::Completed);
    assert_eq!(report.ingestion.run.records_processed, 1);
    assert_eq!(report.ingestion.run.errors_encountered, 0);

    let runs = store.ingestion_runs().await.unwrap();
    assert_eq!(runs.len(), 1);
    assert_eq!(runs[0].user_id, "U1");

    let response = query_metrics(
        &store,
        &MetricsQuery {
            user_id: "U1".to_string(),
            metric_type: "heart_rate".to_string(),
            start_date: "2024-01-15".to_string(),
            end_date: "2024-01-16".to_string(),
            limit: DEFAULT_LIMIT,
        },
    )
    .await
    .unwrap();

    assert_eq!(response.tier, Tier::Hourly);
    assert_eq!(response.total_records, 1);
    let point = &response.data[0];
    assert_eq!(point.timestamp, Utc.with_ymd_and_hms(2024, 1, 15, 8, 0, 0).unwrap());
    assert_eq!(point.value, 72.0);
    assert_eq!(point.metadata["count"], Scalar::Int(1));
    assert_eq!(point.metadata["min"].as_f64(), Some(72.0));
}

#[tokio::test]
async fn reingesting_a_document_adds_no_rows() {
    let store = SqliteStore::in_memory().await.unwrap();

    ingest_json(&store, SINGLE_READING).await.unwrap();
    let second = ingest_json(&store, SINGLE_READING).await.unwrap();

    assert_eq!(second.ingestion.rows_inserted, 0);
    assert_eq!(store.raw_row_count().await.unwrap(), 1);
}
