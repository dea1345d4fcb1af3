//! Breathing-rate extractor
//!
//! Nightly summaries carry up to four per-stage rates; each present stage
//! becomes its own record stamped at midnight of the summary date.

use crate::error::ComputeError;
use crate::normalizer::NormalizeOutcome;
use crate::schema::{BreathingRateSection, BreathingRateSummary, Field};
use serde_json::Value;

use super::{build_record, metadata, read_section, ModalityExtractor};

/// Breathing-rate sleep-summary extractor
pub struct BreathingRateExtractor;

fn stages(summary: &BreathingRateSummary) -> [(&'static str, Option<&Field>); 4] {
    [
        ("deep_sleep_br", summary.deep_sleep_br.as_ref()),
        ("rem_sleep_br", summary.rem_sleep_br.as_ref()),
        ("light_sleep_br", summary.light_sleep_br.as_ref()),
        ("full_sleep_br", summary.full_sleep_br.as_ref()),
    ]
}

impl ModalityExtractor for BreathingRateExtractor {
    fn section(&self) -> &'static str {
        "breathing_rate"
    }

    fn extract(&self, section: &Value, out: &mut NormalizeOutcome) -> Result<(), ComputeError> {
        let section: BreathingRateSection = read_section(self.section(), section)?;

        for summary in &section.sleep_summaries {
            for (stage, field) in stages(summary) {
                let Some(field) = field else {
                    continue;
                };
                let timestamp = match summary.date.as_ref() {
                    None => Err(ComputeError::MissingField("date".to_string())),
                    Some(date) => date.as_midnight().ok_or_else(|| {
                        ComputeError::DateParseError(format!("unparseable date {}", date.0))
                    }),
                };
                out.accept(build_record(
                    format!("breathing_rate_{}", stage),
                    summary.participant_id.as_ref(),
                    timestamp,
                    Some(field),
                    metadata("per_sleep", "medium"),
                ));
            }
        }

        Ok(())
    }
}
