//! Synheart Store - wearable time-series ingestion and resolution-tiered queries
//!
//! Store turns clinical-trial wearable exports into canonical time-series
//! records and serves them back at a resolution that fits the requested range:
//! ingestion document → normalization → batched upsert → tiered query.
//!
//! ## Modules
//!
//! - **Ingestion**: [`normalizer`] flattens modality sections into
//!   [`CanonicalRecord`]s and [`ingest`] writes them in idempotent chunks
//! - **Query**: [`tier`] picks raw, minute, hourly or daily resolution and
//!   [`query`] builds the matching query; [`service`] wires both to a store

pub mod adapters;
pub mod config;
pub mod error;
pub mod ingest;
pub mod normalizer;
pub mod pipeline;
pub mod query;
pub mod schema;
pub mod service;
pub mod store;
pub mod tier;
pub mod types;

pub use config::StoreConfig;
pub use error::{ComputeError, ErrorClass, PipelineError, StoreError};
pub use ingest::{BatchIngestor, RunContext};
pub use normalizer::{MetricNormalizer, NormalizeOutcome};
pub use pipeline::{ingest_json, PipelineReport, StoreProcessor};
pub use query::{QueryBuilder, QuerySpec};
pub use service::{query_metrics, MetricsQuery, MetricsResponse};
pub use store::{MetricStore, SqliteStore};
pub use tier::{select_tier, Tier};
pub use types::{CanonicalRecord, IngestionRun, MetricPoint, RunResult, RunStatus};

/// Crate version, reported by the CLI
pub const STORE_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Producer name for CLI output
pub const PRODUCER_NAME: &str = "synheart-store";
