//! Translation of a [`ReportSpec`] into the Data API `runReport` request body.

use super::{FilterKind, FilterLogic, MatchType, OrderKind, ReportSpec};
use serde::{Deserialize, Serialize};
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireDateRange {
    pub start_date: String,
    pub end_date: String,
}

/// `{ "name": ... }` wrapper used for both metrics and dimensions
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NamedField {
    pub name: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MetricAggregation {
    Total,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StringMatchType {
    Exact,
    BeginsWith,
    EndsWith,
    Contains,
    FullRegexp,
    PartialRegexp,
}

impl From<MatchType> for StringMatchType {
    fn from(match_type: MatchType) -> Self {
        match match_type {
            MatchType::Exact => StringMatchType::Exact,
            MatchType::BeginsWith => StringMatchType::BeginsWith,
            MatchType::EndsWith => StringMatchType::EndsWith,
            MatchType::Contains => StringMatchType::Contains,
            MatchType::FullRegexp => StringMatchType::FullRegexp,
            MatchType::PartialRegexp => StringMatchType::PartialRegexp,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StringFilter {
    pub match_type: StringMatchType,
    pub value: String,
    pub case_sensitive: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldFilter {
    pub field_name: String,
    pub string_filter: StringFilter,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterExpressionList {
    pub expressions: Vec<FilterExpression>,
}

/// Filter expression tree. Serializes to the Data API's one-of shape, e.g.
/// `{"andGroup": {"expressions": [...]}}` or `{"notExpression": {"filter": {...}}}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FilterExpression {
    AndGroup(FilterExpressionList),
    OrGroup(FilterExpressionList),
    NotExpression(Box<FilterExpression>),
    Filter(FieldFilter),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricOrderBy {
    pub metric_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DimensionOrderBy {
    pub dimension_name: String,
}

/// Exactly one of `metric` / `dimension` is set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WireOrderBy {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metric: Option<MetricOrderBy>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dimension: Option<DimensionOrderBy>,
    pub desc: bool,
}

/// Body of `POST properties/{id}:runReport`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunReportRequest {
    pub date_ranges: Vec<WireDateRange>,
    pub metrics: Vec<NamedField>,
    pub dimensions: Vec<NamedField>,
    pub metric_aggregations: Vec<MetricAggregation>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dimension_filter: Option<FilterExpression>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub order_bys: Vec<WireOrderBy>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<u64>,
}

fn named(names: &[String]) -> Vec<NamedField> {
    names.iter().map(|name| NamedField { name: name.clone() }).collect()
}

/// Build the wire request for a report spec. Pure; no validation beyond what the wire shape
/// requires.
///
/// Metric filter clauses are dropped: the Data API takes them in a separate `metricFilter`
/// expression with numeric comparisons, which the clause model does not express yet. When every
/// clause is dropped the filter section is omitted entirely.
pub fn build_request(spec: &ReportSpec) -> RunReportRequest {
    let date_ranges = vec![WireDateRange {
        start_date: spec.date_range.start_or_today().to_string(),
        end_date: spec.date_range.end_or_today().to_string(),
    }];

    let order_bys = spec
        .order_by
        .iter()
        .map(|order| match order.kind {
            OrderKind::Metric => WireOrderBy {
                metric: Some(MetricOrderBy {
                    metric_name: order.name.clone(),
                }),
                dimension: None,
                desc: order.descending,
            },
            OrderKind::Dimension => WireOrderBy {
                metric: None,
                dimension: Some(DimensionOrderBy {
                    dimension_name: order.name.clone(),
                }),
                desc: order.descending,
            },
        })
        .collect();

    let dimension_filter = spec.filters.as_ref().and_then(|filters| {
        let expressions: Vec<FilterExpression> = filters
            .filters
            .iter()
            .filter_map(|clause| match clause.kind {
                FilterKind::Dimension => {
                    let filter = FilterExpression::Filter(FieldFilter {
                        field_name: clause.name.clone(),
                        string_filter: StringFilter {
                            match_type: clause.match_type.into(),
                            value: clause.value.clone(),
                            case_sensitive: true,
                        },
                    });
                    Some(if clause.negate {
                        FilterExpression::NotExpression(Box::new(filter))
                    } else {
                        filter
                    })
                }
                FilterKind::Metric => {
                    debug!(field = %clause.name, "Skipping metric filter clause");
                    None
                }
            })
            .collect();

        if expressions.is_empty() {
            return None;
        }

        let list = FilterExpressionList { expressions };
        Some(match filters.logic {
            FilterLogic::And => FilterExpression::AndGroup(list),
            FilterLogic::Or => FilterExpression::OrGroup(list),
        })
    });

    RunReportRequest {
        date_ranges,
        metrics: named(&spec.metrics),
        dimensions: named(&spec.dimensions),
        metric_aggregations: vec![MetricAggregation::Total],
        dimension_filter,
        order_bys,
        limit: (spec.limit > 0).then_some(spec.limit),
    }
}
