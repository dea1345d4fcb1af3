//! Blood-oxygen extractor

use crate::error::ComputeError;
use crate::normalizer::NormalizeOutcome;
use crate::schema::Spo2Section;
use serde_json::Value;

use super::{build_record, metadata, read_section, required_timestamp, ModalityExtractor};

/// Per-minute sleep SpO2 extractor
pub struct Spo2Extractor;

impl ModalityExtractor for Spo2Extractor {
    fn section(&self) -> &'static str {
        "spo2"
    }

    fn extract(&self, section: &Value, out: &mut NormalizeOutcome) -> Result<(), ComputeError> {
        let section: Spo2Section = read_section(self.section(), section)?;

        for entry in &section.sleep_data {
            out.accept(build_record(
                "spo2".to_string(),
                entry.participant_id.as_ref(),
                required_timestamp(entry.timestamp.as_ref()),
                entry.spo2_value.as_ref(),
                metadata("per_minute_during_sleep", "medium"),
            ));
        }

        Ok(())
    }
}
