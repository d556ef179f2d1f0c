//! Normalization of `runReport` responses.
//!
//! The Data API returns headers and row values as parallel arrays with no inline keys, so every
//! value is matched to its header by position. Header order mirrors request order.

use super::{NormalizedReport, ReportRow};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Header {
    pub name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WireValue {
    #[serde(default)]
    pub value: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct WireRow {
    pub dimension_values: Vec<WireValue>,
    pub metric_values: Vec<WireValue>,
}

/// The subset of the `runReport` response this crate reads. Unknown fields (`metadata`, `kind`,
/// `rowCount`, ...) are ignored.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RunReportResponse {
    pub dimension_headers: Vec<Header>,
    pub metric_headers: Vec<Header>,
    /// `None` when the key is absent, which the API does for empty results
    pub rows: Option<Vec<WireRow>>,
    pub totals: Vec<WireRow>,
}

impl RunReportResponse {
    pub fn has_rows(&self) -> bool {
        self.rows.as_ref().is_some_and(|rows| !rows.is_empty())
    }
}

/// Zip header names against values by position. Extra values on either side are dropped.
fn zip_into(record: &mut ReportRow, headers: &[String], values: &[WireValue]) {
    for (name, value) in headers.iter().zip(values) {
        record.insert(name.clone(), value.value.clone());
    }
}

/// Flatten a raw response into a [`NormalizedReport`].
///
/// A response without rows (key missing or empty) is the legitimate "no data" result and yields
/// [`NormalizedReport::empty`].
pub fn normalize(raw: &RunReportResponse) -> NormalizedReport {
    let Some(raw_rows) = raw.rows.as_deref().filter(|rows| !rows.is_empty()) else {
        return NormalizedReport::empty();
    };

    let metric_headers: Vec<String> = raw.metric_headers.iter().map(|h| h.name.clone()).collect();
    let dimension_headers: Vec<String> = raw.dimension_headers.iter().map(|h| h.name.clone()).collect();

    let rows = raw_rows
        .iter()
        .map(|row| {
            let mut record = ReportRow::new();
            zip_into(&mut record, &metric_headers, &row.metric_values);
            // Dimension values win on a name collision
            zip_into(&mut record, &dimension_headers, &row.dimension_values);
            record
        })
        .collect();

    let mut aggregations = BTreeMap::new();
    if let Some(total) = raw.totals.first() {
        zip_into(&mut aggregations, &metric_headers, &total.metric_values);
    }

    let mut headers = metric_headers;
    headers.extend(dimension_headers);

    NormalizedReport {
        headers,
        rows,
        aggregations,
        error: None,
    }
}
