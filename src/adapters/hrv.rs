//! Heart-rate-variability extractor

use crate::error::ComputeError;
use crate::normalizer::NormalizeOutcome;
use crate::schema::HrvSection;
use serde_json::Value;

use super::{build_record, metadata, read_section, required_timestamp, ModalityExtractor};

/// Sleep-time HRV extractor (RMSSD and spectral bands)
pub struct HrvExtractor;

impl ModalityExtractor for HrvExtractor {
    fn section(&self) -> &'static str {
        "heart_rate_variability"
    }

    fn extract(&self, section: &Value, out: &mut NormalizeOutcome) -> Result<(), ComputeError> {
        let section: HrvSection = read_section(self.section(), section)?;

        for entry in &section.sleep_data {
            let measures = [
                ("rmssd", entry.rmssd.as_ref()),
                ("lf", entry.lf.as_ref()),
                ("hf", entry.hf.as_ref()),
            ];
            for (measure, field) in measures {
                if let Some(field) = field {
                    out.accept(build_record(
                        format!("hrv_{}", measure),
                        entry.participant_id.as_ref(),
                        required_timestamp(entry.timestamp.as_ref()),
                        Some(field),
                        metadata("5_min_during_sleep", "medium"),
                    ));
                }
            }
        }

        Ok(())
    }
}
