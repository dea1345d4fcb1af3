//! Tier-aware query building
//!
//! This module turns query parameters plus a tier into a [`QuerySpec`]: the
//! source, predicate, ordering, limit and value/metadata shape a store needs
//! to answer the query.

use crate::error::StoreError;
use crate::tier::Tier;
use chrono::{DateTime, Utc};
use serde::Serialize;

/// Default cap on returned rows
pub const DEFAULT_LIMIT: u32 = 1000;

/// Shape of the value and metadata columns a query yields
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueShape {
    /// Stored value and caller-supplied metadata, verbatim
    Sample,
    /// Bucket mean, with metadata synthesized as `{min, max, count}`
    BucketSummary,
}

/// A fully validated, tier-specific query
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QuerySpec {
    pub tier: Tier,
    pub user_id: String,
    pub metric_type: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub limit: u32,
}

impl QuerySpec {
    pub fn shape(&self) -> ValueShape {
        if self.tier.is_aggregated() {
            ValueShape::BucketSummary
        } else {
            ValueShape::Sample
        }
    }

    pub fn source(&self) -> &'static str {
        self.tier.source()
    }

    /// SQL text with positional `?` parameters
    ///
    /// Parameters bind in order: user_id, metric_type, start, end, limit.
    /// The time range is inclusive at both ends.
    pub fn sql(&self) -> String {
        let time = self.tier.time_column();
        let projection = match self.shape() {
            ValueShape::Sample => "timestamp, value, metadata".to_string(),
            ValueShape::BucketSummary => format!(
                "{time} AS timestamp, avg_value AS value, \
                 json_object('min', min_value, 'max', max_value, 'count', count) AS metadata"
            ),
        };

        format!(
            "SELECT {projection} FROM {source} \
             WHERE user_id = ? AND metric_type = ? AND {time} >= ? AND {time} <= ? \
             ORDER BY {time} ASC LIMIT ?",
            source = self.source(),
        )
    }
}

/// Builder for tier-specific query specs
pub struct QueryBuilder;

impl QueryBuilder {
    /// Build the query for `tier`
    ///
    /// Rejects empty identifiers, a zero limit, and `start >= end`.
    pub fn build(
        tier: Tier,
        user_id: &str,
        metric_type: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        limit: u32,
    ) -> Result<QuerySpec, StoreError> {
        if user_id.trim().is_empty() {
            return Err(StoreError::Validation("user_id is required".to_string()));
        }
        if metric_type.trim().is_empty() {
            return Err(StoreError::Validation("metric_type is required".to_string()));
        }
        if start >= end {
            return Err(StoreError::Validation(
                "start must be before end".to_string(),
            ));
        }
        if limit == 0 {
            return Err(StoreError::Validation(
                "limit must be greater than zero".to_string(),
            ));
        }

        Ok(QuerySpec {
            tier,
            user_id: user_id.to_string(),
            metric_type: metric_type.to_string(),
            start,
            end,
            limit,
        })
    }
}
