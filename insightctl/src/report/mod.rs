//! GA4 report model.
//!
//! A [`ReportSpec`] is what callers ask for: metrics, dimensions, a date range and optional
//! ordering, filtering and row limit. [`request::build_request`] turns it into the Data API's
//! `runReport` body, [`response::normalize`] flattens the reply into a [`NormalizedReport`], and
//! [`fetch::ReportFetcher`] ties both together with the cache and the HTTP call.

pub mod fetch;
pub mod request;
pub mod response;

use crate::errors::ReportError;
use bon::Builder;
use chrono::{Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Literal the Data API accepts in place of a concrete date.
pub const TODAY: &str = "today";

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Inclusive date range. Missing bounds mean "today".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end: Option<String>,
}

impl DateRange {
    pub fn new(start: impl Into<String>, end: impl Into<String>) -> Self {
        Self {
            start: Some(start.into()),
            end: Some(end.into()),
        }
    }

    /// The `days` days up to and including today, as `YYYY-MM-DD` strings.
    pub fn last_days(days: u32) -> Self {
        let today = Utc::now().date_naive();
        let start = today - Duration::days(i64::from(days.saturating_sub(1)));
        Self::new(start.format(DATE_FORMAT).to_string(), today.format(DATE_FORMAT).to_string())
    }

    pub fn start_or_today(&self) -> &str {
        self.start.as_deref().unwrap_or(TODAY)
    }

    pub fn end_or_today(&self) -> &str {
        self.end.as_deref().unwrap_or(TODAY)
    }

    /// Bounds with missing values replaced by today's calendar date, for APIs that don't
    /// understand the `today` literal.
    pub fn calendar_bounds(&self) -> (String, String) {
        let today = || Utc::now().date_naive().format(DATE_FORMAT).to_string();
        (
            self.start.clone().unwrap_or_else(today),
            self.end.clone().unwrap_or_else(today),
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderKind {
    Metric,
    Dimension,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderBy {
    #[serde(rename = "type")]
    pub kind: OrderKind,
    pub name: String,
    #[serde(default)]
    pub descending: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum FilterLogic {
    #[default]
    And,
    Or,
}

/// Which side of the report a filter clause applies to.
///
/// Metric filters are accepted on input but not yet sent upstream; see
/// [`request::build_request`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FilterKind {
    Dimension,
    Metric,
}

/// String match type, keyed by the Data API's numeric enum codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum MatchType {
    Exact = 1,
    BeginsWith = 2,
    EndsWith = 3,
    Contains = 4,
    FullRegexp = 5,
    PartialRegexp = 6,
}

impl TryFrom<u8> for MatchType {
    type Error = String;

    fn try_from(code: u8) -> Result<Self, Self::Error> {
        match code {
            1 => Ok(MatchType::Exact),
            2 => Ok(MatchType::BeginsWith),
            3 => Ok(MatchType::EndsWith),
            4 => Ok(MatchType::Contains),
            5 => Ok(MatchType::FullRegexp),
            6 => Ok(MatchType::PartialRegexp),
            other => Err(format!("unknown match type code {other}")),
        }
    }
}

impl From<MatchType> for u8 {
    fn from(match_type: MatchType) -> Self {
        match_type as u8
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterClause {
    #[serde(rename = "type")]
    pub kind: FilterKind,
    pub name: String,
    pub match_type: MatchType,
    pub value: String,
    /// Wrap the clause in a logical NOT
    #[serde(default)]
    pub negate: bool,
}

impl FilterClause {
    pub fn dimension(name: impl Into<String>, match_type: MatchType, value: impl Into<String>) -> Self {
        Self {
            kind: FilterKind::Dimension,
            name: name.into(),
            match_type,
            value: value.into(),
            negate: false,
        }
    }

    pub fn negated(mut self) -> Self {
        self.negate = true;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Filters {
    #[serde(default)]
    pub logic: FilterLogic,
    pub filters: Vec<FilterClause>,
}

fn default_use_cache() -> bool {
    true
}

/// A report request as callers express it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Builder)]
pub struct ReportSpec {
    /// Logical report name, part of the cache key
    #[builder(into)]
    pub cache_key_name: String,
    pub metrics: Vec<String>,
    #[serde(default)]
    #[builder(default)]
    pub date_range: DateRange,
    #[serde(default)]
    #[builder(default)]
    pub dimensions: Vec<String>,
    #[serde(default)]
    pub order_by: Option<OrderBy>,
    #[serde(default)]
    pub filters: Option<Filters>,
    /// Maximum number of rows; 0 leaves it to the upstream default
    #[serde(default)]
    #[builder(default)]
    pub limit: u64,
    #[serde(default = "default_use_cache")]
    #[builder(default = true)]
    pub use_cache: bool,
}

/// One report row: field name to value.
pub type ReportRow = BTreeMap<String, String>;

/// Flattened report result.
///
/// `headers` lists metric names followed by dimension names in request order. Failures are
/// reported in `error`, never as an `Err`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NormalizedReport {
    pub headers: Vec<String>,
    pub rows: Vec<ReportRow>,
    pub aggregations: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ReportError>,
}

impl NormalizedReport {
    /// The well-formed "no data" result.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn failed(error: ReportError) -> Self {
        Self {
            error: Some(error),
            ..Self::default()
        }
    }

    /// True for the "no data" shape: nothing in any field and no error.
    pub fn is_empty(&self) -> bool {
        self.headers.is_empty() && self.rows.is_empty() && self.aggregations.is_empty() && self.error.is_none()
    }

    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }
}

/// Strip an optional `properties/` prefix so both `123` and `properties/123` address the same
/// property.
pub fn normalize_property_id(property_id: &str) -> &str {
    let trimmed = property_id.trim();
    trimmed.strip_prefix("properties/").unwrap_or(trimmed)
}
