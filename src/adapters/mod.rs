//! Modality extractors
//!
//! This module provides one extractor per ingestion-document section. Each
//! extractor reads its section into a typed shape and emits canonical records.

mod active_zone;
mod breathing_rate;
mod heart_rate;
mod hrv;
mod spo2;

pub use active_zone::ActiveZoneExtractor;
pub use breathing_rate::BreathingRateExtractor;
pub use heart_rate::HeartRateExtractor;
pub use hrv::HrvExtractor;
pub use spo2::Spo2Extractor;

use crate::error::ComputeError;
use crate::normalizer::NormalizeOutcome;
use crate::schema::Field;
use crate::types::{CanonicalRecord, Metadata, Scalar};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::Value;

/// Source tag stamped on every record from a trial export
pub const SOURCE_TAG: &str = "clinical_trial";

/// Trait for modality section extractors
pub trait ModalityExtractor {
    /// Top-level document key this extractor reads
    fn section(&self) -> &'static str;

    /// Extract records from the section into `out`
    ///
    /// Per-record problems are counted on `out`; an `Err` means the section
    /// itself could not be read.
    fn extract(&self, section: &Value, out: &mut NormalizeOutcome) -> Result<(), ComputeError>;
}

/// Built-in extractors in document order
pub fn default_extractors() -> Vec<Box<dyn ModalityExtractor + Send + Sync>> {
    vec![
        Box::new(HeartRateExtractor),
        Box::new(BreathingRateExtractor),
        Box::new(ActiveZoneExtractor),
        Box::new(HrvExtractor),
        Box::new(Spo2Extractor),
    ]
}

/// Deserialize a section into its typed shape
fn read_section<'a, T: Deserialize<'a>>(
    name: &str,
    section: &'a Value,
) -> Result<T, ComputeError> {
    T::deserialize(section).map_err(|e| ComputeError::SectionShape {
        section: name.to_string(),
        reason: e.to_string(),
    })
}

fn metadata(resolution: &str, priority: &str) -> Metadata {
    let mut m = Metadata::new();
    m.insert("resolution".to_string(), Scalar::from(resolution));
    m.insert("priority".to_string(), Scalar::from(priority));
    m.insert("source".to_string(), Scalar::from(SOURCE_TAG));
    m
}

fn required_timestamp(field: Option<&Field>) -> Result<DateTime<Utc>, ComputeError> {
    let field = field.ok_or_else(|| ComputeError::MissingField("timestamp".to_string()))?;
    field
        .as_timestamp()
        .ok_or_else(|| ComputeError::DateParseError(format!("unparseable timestamp {}", field.0)))
}

fn required_participant(field: Option<&Field>) -> Result<String, ComputeError> {
    field
        .and_then(Field::as_text)
        .ok_or_else(|| ComputeError::MissingField("participant_id".to_string()))
}

/// Assemble one candidate record, checking identity and value
fn build_record(
    metric_type: String,
    participant: Option<&Field>,
    timestamp: Result<DateTime<Utc>, ComputeError>,
    value: Option<&Field>,
    metadata: Metadata,
) -> Result<CanonicalRecord, ComputeError> {
    let user_id = required_participant(participant)?;
    let timestamp = timestamp?;
    let value = match value {
        None => return Err(ComputeError::MissingField(format!("{} value", metric_type))),
        Some(field) => field.as_number().ok_or_else(|| ComputeError::RecordTransform {
            metric_type: metric_type.clone(),
            reason: format!("non-numeric value {}", field.0),
        })?,
    };

    Ok(CanonicalRecord {
        timestamp,
        user_id,
        metric_type,
        value,
        metadata,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_build_record_errors() {
        let ts = Ok(Utc::now());
        let missing_user = build_record(
            "spo2".into(),
            None,
            ts,
            Some(&Field(json!(97))),
            Metadata::new(),
        );
        assert!(matches!(missing_user, Err(ComputeError::MissingField(f)) if f == "participant_id"));

        let bad_value = build_record(
            "spo2".into(),
            Some(&Field(json!("U1"))),
            Ok(Utc::now()),
            Some(&Field(json!("high"))),
            Metadata::new(),
        );
        assert!(matches!(bad_value, Err(ComputeError::RecordTransform { .. })));
    }

    #[test]
    fn test_missing_timestamp_is_reported() {
        assert!(matches!(
            required_timestamp(None),
            Err(ComputeError::MissingField(_))
        ));
        assert!(matches!(
            required_timestamp(Some(&Field(json!("soon")))),
            Err(ComputeError::DateParseError(_))
        ));
    }

    #[test]
    fn test_default_extractor_order() {
        let sections: Vec<&str> = default_extractors().iter().map(|e| e.section()).collect();
        assert_eq!(sections, crate::schema::MODALITY_SECTIONS.to_vec());
    }
}
