//! Report fetch orchestration.
//!
//! ```text
//! fetch(spec, property, tokens)
//!   ├─ CachePolicy::effective_use_cache()   // custom credentials off, then override hook
//!   ├─ cache hit?  ──────────────────────────► return cached report
//!   ├─ tokens.access_token()  ── none ───────► error: Missing Access Token
//!   ├─ build_request()
//!   ├─ POST properties/{id}:runReport ─ err ─► error: Transport Failure
//!   ├─ no rows / normalize() empty ──────────► empty report (not cached)
//!   ├─ cache write (if caching)
//!   └─ return normalized report
//! ```
//!
//! Every expected failure comes back inside the [`NormalizedReport`]; nothing here retries.

use super::request::{RunReportRequest, build_request};
use super::response::{RunReportResponse, normalize};
use super::{NormalizedReport, ReportSpec, normalize_property_id};
use crate::auth::AccessTokenProvider;
use crate::cache::{CachePolicy, ReportCache, cache_key};
use crate::config::ReportingConfig;
use crate::errors::{ReportError, ReportErrorKind, Result, UpstreamError};
use crate::upstream;
use metrics::counter;
use reqwest::Client;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, instrument, warn};
use url::Url;

pub struct ReportFetcher {
    client: Client,
    base_url: Url,
    cache: Arc<dyn ReportCache>,
    cache_ttl: Duration,
    policy: CachePolicy,
}

impl ReportFetcher {
    pub fn new(config: &ReportingConfig, cache: Arc<dyn ReportCache>, cache_ttl: Duration, policy: CachePolicy) -> Result<Self> {
        Ok(Self {
            client: upstream::build_client(config.timeout)?,
            base_url: config.base_url.clone(),
            cache,
            cache_ttl,
            policy,
        })
    }

    /// Fetch a report for `property_id`, consulting the cache first when allowed.
    #[instrument(skip_all, fields(report = %spec.cache_key_name, property_id = %property_id))]
    pub async fn fetch(&self, spec: &ReportSpec, property_id: &str, tokens: &dyn AccessTokenProvider) -> NormalizedReport {
        let property_id = normalize_property_id(property_id);
        let use_cache = self.policy.effective_use_cache(spec);
        let key = cache_key(
            &spec.cache_key_name,
            property_id,
            spec.date_range.start_or_today(),
            spec.date_range.end_or_today(),
        );

        if use_cache {
            if let Some(cached) = self.cache.get(&key).await {
                debug!("Serving report from cache");
                counter!("insightctl_report_cache_hits_total").increment(1);
                return cached;
            }
            counter!("insightctl_report_cache_misses_total").increment(1);
        }

        let Some(token) = tokens.access_token().await else {
            warn!("No access token available, skipping report request");
            return failure(
                ReportErrorKind::MissingAccessToken,
                "No valid access token is available for this property. Reconnect the Google account and try again.",
            );
        };

        let body = build_request(spec);

        let raw = match self.run_report(property_id, &token, &body).await {
            Ok(raw) => raw,
            Err(e) => {
                warn!(kind = e.label(), "Report request failed: {}", e);
                return failure(ReportErrorKind::TransportFailure, e.to_string());
            }
        };

        if !raw.has_rows() {
            debug!("Report returned no rows");
            return NormalizedReport::empty();
        }

        let report = normalize(&raw);
        if report.is_empty() {
            return NormalizedReport::empty();
        }

        if use_cache {
            debug!(ttl = %humantime::format_duration(self.cache_ttl), "Caching report");
            self.cache.set(&key, report.clone(), self.cache_ttl).await;
        }

        report
    }

    async fn run_report(&self, property_id: &str, token: &str, body: &RunReportRequest) -> std::result::Result<RunReportResponse, UpstreamError> {
        let url = upstream::ensure_slash(&self.base_url).join(&format!("properties/{property_id}:runReport"))?;
        debug!("Posting report request to {}", url);

        let response = self.client.post(url).bearer_auth(token).json(body).send().await?;

        if !response.status().is_success() {
            return Err(upstream::status_error(response).await);
        }

        let body_text = response.text().await?;
        Ok(serde_json::from_str::<RunReportResponse>(&body_text)?)
    }
}

fn failure(kind: ReportErrorKind, message: impl Into<String>) -> NormalizedReport {
    counter!("insightctl_report_failures_total", "kind" => kind.label()).increment(1);
    NormalizedReport::failed(ReportError::new(kind, message))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::StaticAccessToken;
    use crate::cache::InMemoryReportCache;
    use crate::report::{DateRange, FilterClause, Filters, FilterLogic, MatchType};
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const TTL: Duration = Duration::from_secs(12 * 60 * 60);

    fn report_body() -> serde_json::Value {
        json!({
            "dimensionHeaders": [{"name": "pagePath"}],
            "metricHeaders": [{"name": "sessions", "type": "TYPE_INTEGER"}],
            "rows": [
                {"dimensionValues": [{"value": "/"}], "metricValues": [{"value": "42"}]},
                {"dimensionValues": [{"value": "/blog"}], "metricValues": [{"value": "7"}]}
            ],
            "totals": [{"dimensionValues": [{"value": "RESERVED_TOTAL"}], "metricValues": [{"value": "49"}]}],
            "rowCount": 2,
            "kind": "analyticsData#runReport"
        })
    }

    fn spec() -> ReportSpec {
        ReportSpec::builder()
            .cache_key_name("top-pages")
            .metrics(vec!["sessions".to_string()])
            .dimensions(vec!["pagePath".to_string()])
            .date_range(DateRange::new("2024-01-01", "2024-01-31"))
            .limit(10)
            .build()
    }

    fn fetcher(server: &MockServer, cache: Arc<dyn ReportCache>, policy: CachePolicy) -> ReportFetcher {
        let config = ReportingConfig {
            base_url: Url::parse(&format!("{}/v1beta", server.uri())).unwrap(),
            timeout: Duration::from_secs(5),
        };
        ReportFetcher::new(&config, cache, TTL, policy).unwrap()
    }

    fn token() -> StaticAccessToken {
        StaticAccessToken::new(Some("ya29.test".into()))
    }

    #[test_log::test(tokio::test)]
    async fn test_second_fetch_is_served_from_cache() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1beta/properties/123:runReport"))
            .and(header("authorization", "Bearer ya29.test"))
            .respond_with(ResponseTemplate::new(200).set_body_json(report_body()))
            .expect(1)
            .mount(&server)
            .await;

        let cache = Arc::new(InMemoryReportCache::new(100));
        let fetcher = fetcher(&server, cache.clone(), CachePolicy::default());

        let first = fetcher.fetch(&spec(), "123", &token()).await;
        let second = fetcher.fetch(&spec(), "properties/123", &token()).await;

        assert!(first.error.is_none());
        assert_eq!(first.headers, vec!["sessions", "pagePath"]);
        assert_eq!(first.aggregations["sessions"], "49");
        assert_eq!(serde_json::to_vec(&first).unwrap(), serde_json::to_vec(&second).unwrap());
        assert_eq!(cache.len().await, 1);
    }

    #[tokio::test]
    async fn test_request_body_matches_spec() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1beta/properties/123:runReport"))
            .and(body_partial_json(json!({
                "dateRanges": [{"startDate": "2024-01-01", "endDate": "2024-01-31"}],
                "metricAggregations": ["TOTAL"],
                "limit": 10,
                "dimensionFilter": {"andGroup": {"expressions": [{"notExpression": {"filter": {
                    "fieldName": "pageTitle",
                    "stringFilter": {"matchType": "CONTAINS", "value": "(not set)", "caseSensitive": true}
                }}}]}}
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(report_body()))
            .expect(1)
            .mount(&server)
            .await;

        let mut spec = spec();
        spec.use_cache = false;
        spec.filters = Some(Filters {
            logic: FilterLogic::And,
            filters: vec![FilterClause::dimension("pageTitle", MatchType::Contains, "(not set)").negated()],
        });

        let fetcher = fetcher(&server, Arc::new(InMemoryReportCache::new(100)), CachePolicy::default());
        let report = fetcher.fetch(&spec, "123", &token()).await;
        assert_eq!(report.rows.len(), 2);
    }

    #[tokio::test]
    async fn test_custom_api_keys_bypass_cache() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(report_body()))
            .expect(2)
            .mount(&server)
            .await;

        let cache = Arc::new(InMemoryReportCache::new(100));
        let fetcher = fetcher(&server, cache.clone(), CachePolicy::new(true));

        fetcher.fetch(&spec(), "123", &token()).await;
        fetcher.fetch(&spec(), "123", &token()).await;

        assert!(cache.is_empty().await);
    }

    #[tokio::test]
    async fn test_override_hook_can_disable_cache() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(report_body()))
            .expect(2)
            .mount(&server)
            .await;

        let policy = CachePolicy::default().with_override(|_: bool, _: &ReportSpec| false);
        let fetcher = fetcher(&server, Arc::new(InMemoryReportCache::new(100)), policy);

        fetcher.fetch(&spec(), "123", &token()).await;
        fetcher.fetch(&spec(), "123", &token()).await;
    }

    #[tokio::test]
    async fn test_missing_token_returns_structured_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(report_body()))
            .expect(0)
            .mount(&server)
            .await;

        let fetcher = fetcher(&server, Arc::new(InMemoryReportCache::new(100)), CachePolicy::default());
        let report = fetcher.fetch(&spec(), "123", &StaticAccessToken::new(None)).await;

        let error = report.error.expect("expected an error");
        assert_eq!(error.status, "Missing Access Token");
        assert!(report.headers.is_empty());
        assert!(report.rows.is_empty());
    }

    #[tokio::test]
    async fn test_upstream_error_is_reported_not_cached() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(401).set_body_json(json!({
                "error": {"code": 401, "message": "Request had invalid authentication credentials.", "status": "UNAUTHENTICATED"}
            })))
            .expect(1)
            .mount(&server)
            .await;

        let cache = Arc::new(InMemoryReportCache::new(100));
        let fetcher = fetcher(&server, cache.clone(), CachePolicy::default());
        let report = fetcher.fetch(&spec(), "123", &token()).await;

        let error = report.error.expect("expected an error");
        assert_eq!(error.status, "Transport Failure");
        assert!(error.message.contains("401"));
        assert!(error.message.contains("invalid authentication credentials"));
        assert!(cache.is_empty().await);
    }

    #[tokio::test]
    async fn test_unparseable_body_is_transport_failure() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
            .mount(&server)
            .await;

        let fetcher = fetcher(&server, Arc::new(InMemoryReportCache::new(100)), CachePolicy::default());
        let report = fetcher.fetch(&spec(), "123", &token()).await;

        assert_eq!(report.error.unwrap().status, "Transport Failure");
    }

    #[tokio::test]
    async fn test_connection_failure_is_transport_failure() {
        // Nothing listens on the discard port
        let config = ReportingConfig {
            base_url: Url::parse("http://127.0.0.1:9/v1beta/").unwrap(),
            timeout: Duration::from_secs(5),
        };
        let fetcher = ReportFetcher::new(&config, Arc::new(InMemoryReportCache::new(100)), TTL, CachePolicy::default()).unwrap();

        let report = fetcher.fetch(&spec(), "123", &token()).await;
        assert_eq!(report.error.unwrap().status, "Transport Failure");
    }

    #[tokio::test]
    async fn test_empty_result_is_success_and_not_cached() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "metricHeaders": [{"name": "sessions"}],
                "rowCount": 0,
                "kind": "analyticsData#runReport"
            })))
            .expect(2)
            .mount(&server)
            .await;

        let cache = Arc::new(InMemoryReportCache::new(100));
        let fetcher = fetcher(&server, cache.clone(), CachePolicy::default());

        let first = fetcher.fetch(&spec(), "123", &token()).await;
        let second = fetcher.fetch(&spec(), "123", &token()).await;

        assert_eq!(first, NormalizedReport::empty());
        assert_eq!(second, NormalizedReport::empty());
        assert!(cache.is_empty().await);
    }
}
