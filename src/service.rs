//! Request-scoped metric queries
//!
//! Accepts calendar-date parameters, routes the range to a tier and returns
//! the rows alongside the echoed request.

use crate::error::StoreError;
use crate::query::{QueryBuilder, DEFAULT_LIMIT};
use crate::schema::{midnight_utc, parse_date};
use crate::store::MetricStore;
use crate::tier::{select_tier, Tier};
use crate::types::{MetricPoint, MetricSummary};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

fn default_limit() -> u32 {
    DEFAULT_LIMIT
}

/// Query parameters as received from a caller
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricsQuery {
    pub user_id: String,
    pub metric_type: String,
    /// Inclusive range start, `YYYY-MM-DD`
    pub start_date: String,
    /// Inclusive range end, `YYYY-MM-DD`
    pub end_date: String,
    #[serde(default = "default_limit")]
    pub limit: u32,
}

/// Query result with the echoed request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricsResponse {
    pub user_id: String,
    pub metric_type: String,
    pub start_date: String,
    pub end_date: String,
    pub tier: Tier,
    pub data: Vec<MetricPoint>,
    pub total_records: usize,
}

fn calendar_day(name: &str, raw: &str) -> Result<DateTime<Utc>, StoreError> {
    parse_date(raw).map(midnight_utc).ok_or_else(|| {
        StoreError::Validation(format!("{} must be YYYY-MM-DD, got `{}`", name, raw))
    })
}

/// Run a metrics query against `store`
///
/// Dates are calendar days at UTC midnight. Unparseable dates and
/// `start_date >= end_date` are validation errors and never reach the store.
pub async fn query_metrics<S: MetricStore + ?Sized>(
    store: &S,
    query: &MetricsQuery,
) -> Result<MetricsResponse, StoreError> {
    let start = calendar_day("start_date", &query.start_date)?;
    let end = calendar_day("end_date", &query.end_date)?;

    let tier = select_tier(start, end);
    debug!(%tier, source = tier.source(), "routing metrics query");

    let spec = QueryBuilder::build(tier, &query.user_id, &query.metric_type, start, end, query.limit)?;
    let data = store.fetch(&spec).await?;

    Ok(MetricsResponse {
        user_id: query.user_id.clone(),
        metric_type: query.metric_type.clone(),
        start_date: query.start_date.clone(),
        end_date: query.end_date.clone(),
        tier,
        total_records: data.len(),
        data,
    })
}

/// Metric types stored for `user_id`, most populous first
pub async fn available_metrics<S: MetricStore + ?Sized>(
    store: &S,
    user_id: &str,
) -> Result<Vec<MetricSummary>, StoreError> {
    if user_id.trim().is_empty() {
        return Err(StoreError::Validation("user_id is required".to_string()));
    }
    store.available_metrics(user_id).await
}
