//! Contest model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::constants::{CONTEST_CACHE_PREFIX, DEFAULT_PAGE, DEFAULT_PAGE_LIMIT};

/// Contest database model
///
/// Column names are aliased to the API field names by the SQL layer, so the
/// row decodes with the same camelCase names it is serialized with.
#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[sqlx(rename_all = "camelCase")]
pub struct Contest {
    pub id: i64,
    pub sport: String,
    pub entry_fee: f64,
    /// Maintained by the settlement backend
    pub prize_pool: f64,
    /// Maintained by the registration backend
    pub participants: i32,
    pub starts_at: DateTime<Utc>,
    pub max_players: i32,
}

/// Validated input for a contest insert
#[derive(Debug, Clone, PartialEq)]
pub struct NewContest {
    pub sport: String,
    pub entry_fee: f64,
    pub starts_at: DateTime<Utc>,
    pub max_players: i32,
}

/// Normalized list filter
///
/// Field order is part of the cache key format; do not reorder.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContestFilter {
    pub sport: Option<String>,
    pub min_fee: Option<f64>,
    pub max_fee: Option<f64>,
    pub page: i64,
    pub limit: i64,
}

impl Default for ContestFilter {
    fn default() -> Self {
        Self {
            sport: None,
            min_fee: None,
            max_fee: None,
            page: DEFAULT_PAGE,
            limit: DEFAULT_PAGE_LIMIT,
        }
    }
}

impl ContestFilter {
    /// Rows skipped before the requested page
    pub fn offset(&self) -> i64 {
        (self.page - 1).saturating_mul(self.limit)
    }

    /// Cache key of the list page this filter selects
    pub fn cache_key(&self) -> Result<String, serde_json::Error> {
        Ok(format!("{}{}", CONTEST_CACHE_PREFIX, serde_json::to_string(self)?))
    }
}

/// One page of the contest listing, as returned to clients and cached
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContestPage {
    pub contests: Vec<Contest>,
    pub total: i64,
    pub page: i64,
    pub limit: i64,
    pub total_pages: i64,
}

impl ContestPage {
    pub fn new(contests: Vec<Contest>, total: i64, filter: &ContestFilter) -> Self {
        Self {
            contests,
            total,
            page: filter.page,
            limit: filter.limit,
            total_pages: total_pages(total, filter.limit),
        }
    }
}

/// `ceil(total / limit)`, never less than one
pub fn total_pages(total: i64, limit: i64) -> i64 {
    if limit <= 0 || total <= 0 {
        return 1;
    }
    ((total + limit - 1) / limit).max(1)
}
