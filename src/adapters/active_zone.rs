//! Active-zone-minutes extractor

use crate::error::ComputeError;
use crate::normalizer::NormalizeOutcome;
use crate::schema::{ActiveZoneEntry, ActiveZoneSection, Field};
use serde_json::Value;

use super::{build_record, metadata, read_section, required_timestamp, ModalityExtractor};

/// Per-minute active-zone extractor
pub struct ActiveZoneExtractor;

fn zones(entry: &ActiveZoneEntry) -> [(&'static str, Option<&Field>); 4] {
    [
        ("fat_burn_minutes", entry.fat_burn_minutes.as_ref()),
        ("cardio_minutes", entry.cardio_minutes.as_ref()),
        ("peak_minutes", entry.peak_minutes.as_ref()),
        ("total_minutes", entry.total_minutes.as_ref()),
    ]
}

impl ModalityExtractor for ActiveZoneExtractor {
    fn section(&self) -> &'static str {
        "active_zone_minutes"
    }

    fn extract(&self, section: &Value, out: &mut NormalizeOutcome) -> Result<(), ComputeError> {
        let section: ActiveZoneSection = read_section(self.section(), section)?;

        for entry in &section.intraday_data {
            for (zone, field) in zones(entry) {
                if let Some(field) = field {
                    out.accept(build_record(
                        format!("active_zone_{}", zone),
                        entry.participant_id.as_ref(),
                        required_timestamp(entry.timestamp.as_ref()),
                        Some(field),
                        metadata("per_minute", "medium"),
                    ));
                }
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_partial_zones() {
        let section = json!({
            "intraday_data": [
                {"timestamp": "2024-01-15T18:01:00", "participant_id": "U1", "cardio_minutes": "x", "total_minutes": 3}
            ]
        });

        let mut out = NormalizeOutcome::default();
        ActiveZoneExtractor.extract(&section, &mut out).unwrap();

        assert_eq!(out.records.len(), 1);
        assert_eq!(out.records[0].metric_type, "active_zone_total_minutes");
        assert_eq!(out.records[0].value, 3.0);
        assert_eq!(out.skipped, 1);
    }
}
