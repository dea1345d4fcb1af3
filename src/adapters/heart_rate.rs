//! Heart-rate extractor
//!
//! One record per intraday sample; the entry declares its own metric type.

use crate::error::ComputeError;
use crate::normalizer::NormalizeOutcome;
use crate::schema::{Field, HeartRateSection};
use serde_json::Value;

use super::{build_record, metadata, read_section, required_timestamp, ModalityExtractor};

const DEFAULT_RESOLUTION: &str = "1_second";
const DEFAULT_PRIORITY: &str = "high";

/// Heart-rate intraday extractor
pub struct HeartRateExtractor;

impl ModalityExtractor for HeartRateExtractor {
    fn section(&self) -> &'static str {
        "heart_rate"
    }

    fn extract(&self, section: &Value, out: &mut NormalizeOutcome) -> Result<(), ComputeError> {
        let section: HeartRateSection = read_section(self.section(), section)?;

        for entry in &section.intraday_data {
            let candidate = match entry.metric_type.as_ref().and_then(Field::as_text) {
                Some(metric_type) => {
                    let resolution = entry
                        .resolution
                        .as_ref()
                        .and_then(Field::as_text)
                        .unwrap_or_else(|| DEFAULT_RESOLUTION.to_string());
                    let priority = entry
                        .priority
                        .as_ref()
                        .and_then(Field::as_text)
                        .unwrap_or_else(|| DEFAULT_PRIORITY.to_string());

                    build_record(
                        metric_type,
                        entry.participant_id.as_ref(),
                        required_timestamp(entry.timestamp.as_ref()),
                        entry.value.as_ref(),
                        metadata(&resolution, &priority),
                    )
                }
                None => Err(ComputeError::MissingField("metric_type".to_string())),
            };
            out.accept(candidate);
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use serde_json::json;

    #[test]
    fn test_end_to_end_heart_rate_record() {
        let section = json!({
            "intraday_data": [
                {"timestamp": "2024-01-15T08:00:00Z", "participant_id": "U1", "metric_type": "heart_rate", "value": "72"}
            ]
        });

        let mut out = NormalizeOutcome::default();
        HeartRateExtractor.extract(&section, &mut out).unwrap();

        assert_eq!(out.records.len(), 1);
        let record = &out.records[0];
        assert_eq!(record.timestamp, Utc.with_ymd_and_hms(2024, 1, 15, 8, 0, 0).unwrap());
        assert_eq!(record.user_id, "U1");
        assert_eq!(record.metric_type, "heart_rate");
        assert_eq!(record.value, 72.0);
        assert_eq!(record.metadata["resolution"].as_str(), Some("1_second"));
        assert_eq!(record.metadata["priority"].as_str(), Some("high"));
        assert_eq!(record.metadata["source"].as_str(), Some("clinical_trial"));
        assert_eq!(record.metadata.len(), 3);
    }

    #[test]
    fn test_missing_intraday_data_is_empty() {
        let mut out = NormalizeOutcome::default();
        HeartRateExtractor.extract(&json!({}), &mut out).unwrap();
        assert!(out.records.is_empty());
        assert_eq!(out.skipped, 0);
    }

    #[test]
    fn test_section_not_an_object() {
        let mut out = NormalizeOutcome::default();
        let result = HeartRateExtractor.extract(&json!([1, 2]), &mut out);
        assert!(matches!(result, Err(ComputeError::SectionShape { .. })));
    }
}
