//! Pipeline orchestration
//!
//! Takes an ingestion document through normalization and batched ingestion:
//! document → canonical records → chunked upserts → provenance entry.

use crate::error::PipelineError;
use crate::ingest::{BatchIngestor, RunContext};
use crate::normalizer::{MetricNormalizer, SectionFailure};
use crate::schema::IngestionDocument;
use crate::store::MetricStore;
use crate::types::RunResult;
use serde::Serialize;
use tracing::info;

/// Outcome of ingesting one document
#[derive(Debug, Clone, Serialize)]
pub struct PipelineReport {
    /// Modality sections that were present in the document
    pub sections: Vec<&'static str>,
    /// Candidate records dropped during normalization
    pub records_skipped: u64,
    /// Sections isolated because their shape was wrong
    pub section_failures: Vec<SectionFailure>,
    /// Result of the storage run
    pub ingestion: RunResult,
}

/// Ingest a JSON document into `store` with default settings
///
/// # Example
/// ```ignore
/// let store = SqliteStore::in_memory().await?;
/// let report = ingest_json(&store, &std::fs::read_to_string(path)?).await?;
/// println!("{} records", report.ingestion.run.records_processed);
/// ```
pub async fn ingest_json<S: MetricStore + ?Sized>(
    store: &S,
    raw_json: &str,
) -> Result<PipelineReport, PipelineError> {
    StoreProcessor::new().ingest_json(store, raw_json).await
}

/// Reusable normalizer and ingestor pair
pub struct StoreProcessor {
    normalizer: MetricNormalizer,
    ingestor: BatchIngestor,
}

impl Default for StoreProcessor {
    fn default() -> Self {
        Self::new()
    }
}

impl StoreProcessor {
    /// Create a processor with the built-in extractors and default chunk size
    pub fn new() -> Self {
        Self {
            normalizer: MetricNormalizer::new(),
            ingestor: BatchIngestor::default(),
        }
    }

    /// Create a processor with a specific chunk size
    pub fn with_ingestor(ingestor: BatchIngestor) -> Self {
        Self {
            normalizer: MetricNormalizer::new(),
            ingestor,
        }
    }

    /// Parse and ingest a JSON document
    pub async fn ingest_json<S: MetricStore + ?Sized>(
        &self,
        store: &S,
        raw_json: &str,
    ) -> Result<PipelineReport, PipelineError> {
        let document = IngestionDocument::from_json(raw_json)?;
        self.ingest_document(store, &document).await
    }

    /// Normalize and ingest a parsed document
    ///
    /// Normalization errors are added to the run's error count. The provenance
    /// user falls back to `participant_info.participant_id` when no record
    /// carries a user.
    pub async fn ingest_document<S: MetricStore + ?Sized>(
        &self,
        store: &S,
        document: &IngestionDocument,
    ) -> Result<PipelineReport, PipelineError> {
        let sections = document.present_sections();
        let outcome = self.normalizer.normalize(document);
        info!(
            sections = sections.len(),
            records = outcome.records.len(),
            skipped = outcome.skipped,
            section_failures = outcome.section_failures.len(),
            "document normalized"
        );

        let ctx = RunContext {
            user_id: document.participant_id(),
            prior_errors: outcome.error_count(),
        };
        let ingestion = self.ingestor.ingest(store, &outcome.records, &ctx).await?;

        Ok(PipelineReport {
            sections,
            records_skipped: outcome.skipped,
            section_failures: outcome.section_failures,
            ingestion,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{ComputeError, StoreError};
    use crate::ingest::FALLBACK_USER_ID;
    use crate::store::SqliteStore;
    use crate::types::RunStatus;

    fn sample_document() -> &'static str {
        r#"{
            "heart_rate": {
                "intraday_data": [
                    {"timestamp": "2024-01-15T08:00:00", "participant_id": "P-001",
                     "metric_type": "heart_rate", "value": "72"},
                    {"timestamp": "2024-01-15T08:00:01", "participant_id": "P-001",
                     "metric_type": "heart_rate", "value": "not a number"}
                ]
            },
            "spo2": {
                "sleep_data": [
                    {"timestamp": "2024-01-15T03:00:00", "participant_id": "P-001", "spo2_value": 96.5}
                ]
            },
            "heart_rate_variability": "corrupted",
            "participant_info": {"participant_id": "P-001"}
        }"#
    }

    #[tokio::test]
    async fn test_document_is_ingested_with_normalization_errors_counted() {
        let store = SqliteStore::in_memory().await.unwrap();

        let report = ingest_json(&store, sample_document()).await.unwrap();

        assert_eq!(report.sections, vec!["heart_rate", "heart_rate_variability", "spo2"]);
        assert_eq!(report.records_skipped, 1);
        assert_eq!(report.section_failures.len(), 1);
        assert_eq!(report.section_failures[0].section, "heart_rate_variability");
        assert_eq!(report.ingestion.status, RunStatus::Completed);
        assert_eq!(report.ingestion.run.records_processed, 2);
        assert_eq!(report.ingestion.run.errors_encountered, 2);
        assert_eq!(report.ingestion.run.user_id, "P-001");
        assert_eq!(store.raw_row_count().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_empty_document_writes_nothing() {
        let store = SqliteStore::in_memory().await.unwrap();

        let report = ingest_json(&store, r#"{"participant_info": {"participant_id": "P-7"}}"#)
            .await
            .unwrap();

        assert_eq!(report.ingestion.status, RunStatus::Empty);
        assert_eq!(report.ingestion.run.user_id, "P-7");
        assert!(store.ingestion_runs().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_fallback_user_without_participant() {
        let store = SqliteStore::in_memory().await.unwrap();

        let report = ingest_json(&store, "{}").await.unwrap();
        assert_eq!(report.ingestion.run.user_id, FALLBACK_USER_ID);
    }

    #[tokio::test]
    async fn test_invalid_json_is_compute_error() {
        let store = SqliteStore::in_memory().await.unwrap();

        let err = ingest_json(&store, "[1, 2]").await.unwrap_err();
        assert!(matches!(err, PipelineError::Compute(ComputeError::ParseError(_))));

        let err = ingest_json(&store, "{not json").await.unwrap_err();
        assert!(matches!(err, PipelineError::Compute(ComputeError::JsonError(_))));
    }

    #[tokio::test]
    async fn test_closed_store_surfaces_connectivity() {
        let store = SqliteStore::in_memory().await.unwrap();
        store.pool().close().await;

        let err = ingest_json(&store, sample_document()).await.unwrap_err();
        assert!(matches!(err, PipelineError::Store(StoreError::Connectivity(_))));
    }
}
