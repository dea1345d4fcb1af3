//! Clinical-trial ingestion document
//!
//! The document is a mapping with one optional section per modality. Sections
//! are kept as raw JSON at the top level and deserialized into their typed
//! shape only when extracted, so that a malformed section fails on its own.

use crate::error::ComputeError;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::field::Field;

/// Top-level ingestion document
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IngestionDocument {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub heart_rate: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub breathing_rate: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub active_zone_minutes: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub heart_rate_variability: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spo2: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub participant_info: Option<Value>,
}

impl IngestionDocument {
    /// Parse a document from JSON text
    ///
    /// Only the top level is checked here; it must be an object.
    pub fn from_json(json: &str) -> Result<Self, ComputeError> {
        let value: Value = serde_json::from_str(json)?;
        if !value.is_object() {
            return Err(ComputeError::ParseError(
                "ingestion document must be a JSON object".to_string(),
            ));
        }
        Ok(serde_json::from_value(value)?)
    }

    /// Raw section by its top-level key
    pub fn section(&self, key: &str) -> Option<&Value> {
        let section = match key {
            "heart_rate" => self.heart_rate.as_ref(),
            "breathing_rate" => self.breathing_rate.as_ref(),
            "active_zone_minutes" => self.active_zone_minutes.as_ref(),
            "heart_rate_variability" => self.heart_rate_variability.as_ref(),
            "spo2" => self.spo2.as_ref(),
            _ => None,
        };
        section.filter(|v| !v.is_null())
    }

    /// Names of the modality sections present in this document
    pub fn present_sections(&self) -> Vec<&'static str> {
        MODALITY_SECTIONS
            .iter()
            .copied()
            .filter(|key| self.section(key).is_some())
            .collect()
    }

    /// `participant_info.participant_id`, if present
    pub fn participant_id(&self) -> Option<String> {
        self.participant_info
            .as_ref()?
            .get("participant_id")
            .cloned()
            .and_then(|v| Field(v).as_text())
    }
}

/// Modality section keys in extraction order
pub const MODALITY_SECTIONS: [&str; 5] = [
    "heart_rate",
    "breathing_rate",
    "active_zone_minutes",
    "heart_rate_variability",
    "spo2",
];

/// `heart_rate` section
#[derive(Debug, Clone, Default, Deserialize)]
pub struct HeartRateSection {
    #[serde(default)]
    pub intraday_data: Vec<HeartRateEntry>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HeartRateEntry {
    pub timestamp: Option<Field>,
    pub participant_id: Option<Field>,
    pub metric_type: Option<Field>,
    pub value: Option<Field>,
    pub resolution: Option<Field>,
    pub priority: Option<Field>,
}

/// `breathing_rate` section
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BreathingRateSection {
    #[serde(default)]
    pub sleep_summaries: Vec<BreathingRateSummary>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BreathingRateSummary {
    pub date: Option<Field>,
    pub participant_id: Option<Field>,
    pub deep_sleep_br: Option<Field>,
    pub rem_sleep_br: Option<Field>,
    pub light_sleep_br: Option<Field>,
    pub full_sleep_br: Option<Field>,
}

/// `active_zone_minutes` section
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ActiveZoneSection {
    #[serde(default)]
    pub intraday_data: Vec<ActiveZoneEntry>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ActiveZoneEntry {
    pub timestamp: Option<Field>,
    pub participant_id: Option<Field>,
    pub fat_burn_minutes: Option<Field>,
    pub cardio_minutes: Option<Field>,
    pub peak_minutes: Option<Field>,
    pub total_minutes: Option<Field>,
}

/// `heart_rate_variability` section
#[derive(Debug, Clone, Default, Deserialize)]
pub struct HrvSection {
    #[serde(default)]
    pub sleep_data: Vec<HrvEntry>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HrvEntry {
    pub timestamp: Option<Field>,
    pub participant_id: Option<Field>,
    pub rmssd: Option<Field>,
    pub lf: Option<Field>,
    pub hf: Option<Field>,
}

/// `spo2` section
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Spo2Section {
    #[serde(default)]
    pub sleep_data: Vec<Spo2Entry>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Spo2Entry {
    pub timestamp: Option<Field>,
    pub participant_id: Option<Field>,
    pub spo2_value: Option<Field>,
}
