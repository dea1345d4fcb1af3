//! Resolution tiers
//!
//! Every query is served from one of four fixed tiers. Wider time ranges are
//! routed to coarser tiers so that result cardinality stays bounded.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Storage resolution tier, finest first
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    Raw,
    Minute,
    Hourly,
    Daily,
}

impl Tier {
    /// All tiers in order of increasing coarseness
    pub const ALL: [Tier; 4] = [Tier::Raw, Tier::Minute, Tier::Hourly, Tier::Daily];

    pub fn as_str(&self) -> &'static str {
        match self {
            Tier::Raw => "raw",
            Tier::Minute => "minute",
            Tier::Hourly => "hourly",
            Tier::Daily => "daily",
        }
    }

    /// Physical table or view backing this tier
    pub fn source(&self) -> &'static str {
        match self {
            Tier::Raw => "raw_data",
            Tier::Minute => "data_1m",
            Tier::Hourly => "data_1h",
            Tier::Daily => "data_1d",
        }
    }

    /// Time column of the tier's source
    pub fn time_column(&self) -> &'static str {
        match self {
            Tier::Raw => "timestamp",
            _ => "bucket",
        }
    }

    /// True for the bucketed tiers
    pub fn is_aggregated(&self) -> bool {
        !matches!(self, Tier::Raw)
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Tier {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "raw" => Ok(Tier::Raw),
            "minute" => Ok(Tier::Minute),
            "hourly" => Ok(Tier::Hourly),
            "daily" => Ok(Tier::Daily),
            other => Err(format!(
                "unknown tier `{}`; expected one of: raw, minute, hourly, daily",
                other
            )),
        }
    }
}

/// Choose the tier for the range `[start, end]`
///
/// Thresholds are strict: a span of exactly seven days is served hourly,
/// exactly six hours per minute, and exactly one hour from raw samples.
pub fn select_tier(start: DateTime<Utc>, end: DateTime<Utc>) -> Tier {
    let span = end - start;

    if span > Duration::days(7) {
        Tier::Daily
    } else if span > Duration::hours(6) {
        Tier::Hourly
    } else if span > Duration::hours(1) {
        Tier::Minute
    } else {
        Tier::Raw
    }
}
