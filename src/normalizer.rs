//! Metric normalization
//!
//! This module flattens an ingestion document into canonical records.
//! - Each modality section is handled by its own extractor
//! - A bad record is skipped and counted, never fatal
//! - A malformed section is isolated; the other sections still run

use crate::adapters::{default_extractors, ModalityExtractor};
use crate::error::ComputeError;
use crate::schema::IngestionDocument;
use crate::types::CanonicalRecord;
use serde::Serialize;
use tracing::{debug, warn};

/// A modality section that could not be processed
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SectionFailure {
    pub section: String,
    pub reason: String,
}

/// Accumulated result of normalizing one document
#[derive(Debug, Clone, Default, Serialize)]
pub struct NormalizeOutcome {
    /// Records extracted from every section that could be read
    pub records: Vec<CanonicalRecord>,
    /// Candidate records dropped for a missing field or failed coercion
    pub skipped: u64,
    /// Sections that were isolated because their shape was wrong
    pub section_failures: Vec<SectionFailure>,
}

impl NormalizeOutcome {
    /// Record a candidate, or count it as skipped
    pub fn accept(&mut self, candidate: Result<CanonicalRecord, ComputeError>) {
        match candidate {
            Ok(record) => self.records.push(record),
            Err(e) => {
                debug!(error = %e, "skipping candidate record");
                self.skipped += 1;
            }
        }
    }

    /// Skipped records plus failed sections
    pub fn error_count(&self) -> u64 {
        self.skipped + self.section_failures.len() as u64
    }

    /// First participant id carried by any record
    pub fn first_user_id(&self) -> Option<&str> {
        self.records.first().map(|r| r.user_id.as_str())
    }
}

/// Normalizer for converting ingestion documents into canonical records
pub struct MetricNormalizer {
    extractors: Vec<Box<dyn ModalityExtractor + Send + Sync>>,
}

impl Default for MetricNormalizer {
    fn default() -> Self {
        Self::new()
    }
}

impl MetricNormalizer {
    /// Create a normalizer with the built-in modality extractors
    pub fn new() -> Self {
        Self {
            extractors: default_extractors(),
        }
    }

    /// Create a normalizer with a custom set of extractors
    pub fn with_extractors(extractors: Vec<Box<dyn ModalityExtractor + Send + Sync>>) -> Self {
        Self { extractors }
    }

    /// Normalize a parsed document
    ///
    /// Always returns whatever could be extracted.
    pub fn normalize(&self, document: &IngestionDocument) -> NormalizeOutcome {
        let mut outcome = NormalizeOutcome::default();

        for extractor in &self.extractors {
            let key = extractor.section();
            let Some(section) = document.section(key) else {
                continue;
            };

            let before = outcome.records.len();
            let skipped_before = outcome.skipped;
            if let Err(e) = extractor.extract(section, &mut outcome) {
                // A failed section contributes nothing
                outcome.records.truncate(before);
                outcome.skipped = skipped_before;
                warn!(section = key, error = %e, "modality section isolated");
                outcome.section_failures.push(SectionFailure {
                    section: key.to_string(),
                    reason: e.to_string(),
                });
                continue;
            }
            debug!(
                section = key,
                records = outcome.records.len() - before,
                "modality section normalized"
            );
        }

        outcome
    }

    /// Parse JSON text and normalize it
    pub fn normalize_json(&self, json: &str) -> Result<NormalizeOutcome, ComputeError> {
        let document = IngestionDocument::from_json(json)?;
        Ok(self.normalize(&document))
    }
}
