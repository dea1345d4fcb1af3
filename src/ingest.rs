//! Batched, idempotent ingestion
//!
//! Records are written in fixed-size chunks. Each chunk is atomic; a failed
//! chunk is counted and skipped while the rest of the run continues. One
//! provenance entry is appended once all chunks have been attempted.

use crate::error::StoreError;
use crate::store::MetricStore;
use crate::types::{CanonicalRecord, IngestionRun, RunResult, RunStatus};
use chrono::{DateTime, Utc};
use std::time::Instant;
use tracing::{debug, error, info, info_span, warn, Instrument};
use uuid::Uuid;

/// Default number of records per chunk
pub const DEFAULT_BATCH_SIZE: usize = 1000;

/// User id recorded when neither the records nor the caller name one
pub const FALLBACK_USER_ID: &str = "synthetic_user_001";

/// Caller-supplied context for one run
#[derive(Debug, Clone, Default)]
pub struct RunContext {
    /// User id for the provenance entry; the first record's user wins if unset
    pub user_id: Option<String>,
    /// Errors already seen upstream, such as skipped records during normalization
    pub prior_errors: u64,
}

impl RunContext {
    pub fn for_user(user_id: impl Into<String>) -> Self {
        Self {
            user_id: Some(user_id.into()),
            prior_errors: 0,
        }
    }

    pub fn with_prior_errors(mut self, prior_errors: u64) -> Self {
        self.prior_errors = prior_errors;
        self
    }
}

/// Running counters for one ingestion run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunTally {
    pub records_processed: u64,
    pub rows_inserted: u64,
    pub errors_encountered: u64,
    pub batches_attempted: usize,
    pub batches_failed: usize,
}

impl RunTally {
    fn seeded(prior_errors: u64) -> Self {
        Self {
            errors_encountered: prior_errors,
            ..Self::default()
        }
    }

    fn committed(mut self, size: usize, inserted: u64) -> Self {
        self.batches_attempted += 1;
        self.records_processed += size as u64;
        self.rows_inserted += inserted;
        self
    }

    fn failed(mut self) -> Self {
        self.batches_attempted += 1;
        self.batches_failed += 1;
        self.errors_encountered += 1;
        self
    }
}

/// Writes canonical records to a [`MetricStore`] in chunks
#[derive(Debug, Clone)]
pub struct BatchIngestor {
    batch_size: usize,
}

impl Default for BatchIngestor {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }
}

impl BatchIngestor {
    /// Create an ingestor with the given chunk size
    ///
    /// A zero chunk size is a validation error.
    pub fn new(batch_size: usize) -> Result<Self, StoreError> {
        if batch_size == 0 {
            return Err(StoreError::Validation(
                "batch_size must be greater than zero".to_string(),
            ));
        }
        Ok(Self { batch_size })
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// Ingest `records` into `store`
    ///
    /// Fails only when the store cannot be reached, which is checked before
    /// anything else, including for empty input.
    /// Chunk failures are isolated and reported through the returned counters.
    pub async fn ingest<S: MetricStore + ?Sized>(
        &self,
        store: &S,
        records: &[CanonicalRecord],
        ctx: &RunContext,
    ) -> Result<RunResult, StoreError> {
        let run_id = Uuid::new_v4();
        let span = info_span!("ingest", %run_id, records = records.len());
        self.run(store, records, ctx, run_id).instrument(span).await
    }

    async fn run<S: MetricStore + ?Sized>(
        &self,
        store: &S,
        records: &[CanonicalRecord],
        ctx: &RunContext,
        run_id: Uuid,
    ) -> Result<RunResult, StoreError> {
        let started_at = Utc::now();
        let clock = Instant::now();
        let user_id = resolve_user(records, ctx);

        if let Err(e) = store.ping().await {
            error!(error = %e, "store unreachable, aborting ingestion");
            return Err(match e {
                StoreError::Connectivity(_) => e,
                other => StoreError::Connectivity(other.to_string()),
            });
        }

        if records.is_empty() {
            info!("no records to ingest");
            return Ok(RunResult {
                run_id,
                status: RunStatus::Empty,
                run: provenance(user_id, started_at, clock, RunTally::seeded(ctx.prior_errors)),
                batches_attempted: 0,
                batches_failed: 0,
                rows_inserted: 0,
                provenance_recorded: false,
            });
        }

        info!(user_id = %user_id, batch_size = self.batch_size, "starting ingestion");

        let mut tally = RunTally::seeded(ctx.prior_errors);
        for (index, chunk) in records.chunks(self.batch_size).enumerate() {
            tally = match store.upsert_batch(chunk).await {
                Ok(inserted) => {
                    debug!(batch = index, size = chunk.len(), inserted, "batch committed");
                    tally.committed(chunk.len(), inserted)
                }
                Err(e) => {
                    let failure = StoreError::BatchWrite {
                        batch: index,
                        reason: e.to_string(),
                    };
                    warn!(error = %failure, size = chunk.len(), "batch rolled back");
                    tally.failed()
                }
            };
        }

        let run = provenance(user_id, started_at, clock, tally);
        let provenance_recorded = match store.record_run(&run).await {
            Ok(()) => true,
            Err(e) => {
                warn!(error = %e, "failed to record ingestion provenance");
                false
            }
        };

        let status = if tally.batches_failed == 0 {
            RunStatus::Completed
        } else {
            RunStatus::CompletedWithErrors
        };

        info!(
            records_processed = run.records_processed,
            rows_inserted = tally.rows_inserted,
            errors = run.errors_encountered,
            duration_seconds = run.duration_seconds,
            "ingestion finished"
        );

        Ok(RunResult {
            run_id,
            status,
            run,
            batches_attempted: tally.batches_attempted,
            batches_failed: tally.batches_failed,
            rows_inserted: tally.rows_inserted,
            provenance_recorded,
        })
    }
}

fn resolve_user(records: &[CanonicalRecord], ctx: &RunContext) -> String {
    records
        .first()
        .map(|r| r.user_id.clone())
        .or_else(|| ctx.user_id.clone())
        .unwrap_or_else(|| FALLBACK_USER_ID.to_string())
}

fn provenance(
    user_id: String,
    started_at: DateTime<Utc>,
    clock: Instant,
    tally: RunTally,
) -> IngestionRun {
    IngestionRun {
        user_id,
        started_at,
        records_processed: tally.records_processed,
        errors_encountered: tally.errors_encountered,
        duration_seconds: clock.elapsed().as_secs_f64(),
    }
}
