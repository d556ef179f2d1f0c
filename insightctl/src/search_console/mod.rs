//! Search Console query with property resolution.
//!
//! The stored site URL rarely matches the exact form the site was verified under, so
//! [`SearchConsoleResolver::resolve_and_query`] tries every variant from
//! [`candidates::candidates`] in order and keeps the best answer:
//!
//! 1. the first variant whose query returned rows, else
//! 2. the first variant that answered HTTP 200 with a JSON object, else
//! 3. a "No Stats Available for <host>" error.
//!
//! All variants are queried, one after another, even once one with data has been seen.
//! Individual failures are logged and skipped.

pub mod candidates;

use crate::config::SearchConsoleConfig;
use crate::errors::{ReportError, ReportErrorKind, Result, UpstreamError};
use crate::report::DateRange;
use crate::upstream;
use candidates::{candidates, encode_property, site_host};
use metrics::counter;
use reqwest::{Client, StatusCode};
use serde::Serialize;
use serde_json::{Value, json};
use tracing::{debug, info, instrument, warn};
use url::Url;

/// A variant that answered HTTP 200 with a JSON object.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DomainCandidate {
    pub url_variant: String,
    pub http_status: u16,
    pub row_count: usize,
    pub payload: Value,
}

/// `{"response": ...}` or `{"error": {...}}`, the shape dashboard consumers expect.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchConsoleOutcome {
    Response(Value),
    Error(ReportError),
}

impl From<std::result::Result<DomainCandidate, ReportError>> for SearchConsoleOutcome {
    fn from(result: std::result::Result<DomainCandidate, ReportError>) -> Self {
        match result {
            Ok(candidate) => SearchConsoleOutcome::Response(candidate.payload),
            Err(error) => SearchConsoleOutcome::Error(error),
        }
    }
}

pub struct SearchConsoleResolver {
    client: Client,
    base_url: Url,
}

impl SearchConsoleResolver {
    pub fn new(config: &SearchConsoleConfig) -> Result<Self> {
        Ok(Self {
            client: upstream::build_client(config.timeout)?,
            base_url: config.base_url.clone(),
        })
    }

    /// Resolve the Search Console property for `stored_site_url` and return the selected
    /// variant's search-analytics payload (top queries for `date_range`, at most `limit` rows).
    #[instrument(skip(self, access_token), fields(site = %stored_site_url))]
    pub async fn resolve_and_query(
        &self,
        stored_site_url: &str,
        date_range: &DateRange,
        limit: u32,
        access_token: &str,
    ) -> std::result::Result<DomainCandidate, ReportError> {
        if stored_site_url.trim().is_empty() {
            return Err(ReportError::new(
                ReportErrorKind::NoStats,
                "No URL found for this site. Check the site address in the WordPress settings.",
            ));
        }

        let Some(host) = site_host(stored_site_url) else {
            return Err(ReportError::new(
                ReportErrorKind::NoStatsForHost(stored_site_url.trim().to_string()),
                "The stored site URL does not contain a host name.",
            ));
        };

        let (start_date, end_date) = date_range.calendar_bounds();
        let body = json!({
            "startDate": start_date,
            "endDate": end_date,
            "dimensions": ["query"],
            "rowLimit": limit,
        });

        let mut first_with_data: Option<DomainCandidate> = None;
        let mut first_without_data: Option<DomainCandidate> = None;

        for variant in candidates(&host) {
            match self.query_candidate(&variant, &body, access_token).await {
                Ok(candidate) => {
                    debug!(variant = %variant, rows = candidate.row_count, "Search Console property answered");
                    let outcome = if candidate.row_count > 0 { "data" } else { "no_data" };
                    counter!("insightctl_search_console_candidates_total", "outcome" => outcome).increment(1);

                    let slot = if candidate.row_count > 0 {
                        &mut first_with_data
                    } else {
                        &mut first_without_data
                    };
                    if slot.is_none() {
                        *slot = Some(candidate);
                    }
                }
                Err(e) => {
                    warn!(variant = %variant, kind = e.label(), "Search Console property rejected: {}", e);
                    counter!("insightctl_search_console_candidates_total", "outcome" => e.label()).increment(1);
                }
            }
        }

        match first_with_data.or(first_without_data) {
            Some(selected) => {
                info!(variant = %selected.url_variant, rows = selected.row_count, "Resolved Search Console property");
                Ok(selected)
            }
            None => Err(ReportError::new(
                ReportErrorKind::NoStatsForHost(host),
                "None of the Search Console property variants for this site returned data. \
                 Make sure the site is verified in Google Search Console for the connected account.",
            )),
        }
    }

    async fn query_candidate(&self, variant: &str, body: &Value, access_token: &str) -> std::result::Result<DomainCandidate, UpstreamError> {
        let path = format!("sites/{}/searchAnalytics/query", encode_property(variant));
        let url = upstream::ensure_slash(&self.base_url).join(&path)?;

        let response = self.client.post(url).bearer_auth(access_token).json(body).send().await?;

        let status = response.status();
        if status != StatusCode::OK {
            return Err(upstream::status_error(response).await);
        }

        let text = response.text().await?;
        let payload: Value = serde_json::from_str(&text)?;
        if !payload.is_object() {
            return Err(UpstreamError::NotAnObject);
        }

        let row_count = payload.get("rows").and_then(Value::as_array).map_or(0, Vec::len);

        Ok(DomainCandidate {
            url_variant: variant.to_string(),
            http_status: status.as_u16(),
            row_count,
            payload,
        })
    }
}
