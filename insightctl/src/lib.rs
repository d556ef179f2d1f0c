//! # insightctl: GA4 reporting core
//!
//! `insightctl` fetches Google Analytics 4 reports for a dashboard, flattens them into a simple
//! tabular shape and caches the results. It also resolves which Search Console property a site is
//! registered under and returns that property's top queries.
//!
//! ## Reports
//!
//! A [`ReportSpec`] names the metrics, dimensions, date range, ordering, filters and row limit of a
//! report. [`Insights::report`] runs it against the Data API `runReport` endpoint:
//!
//! 1. decide whether the cache may be used ([`cache::CachePolicy`]): tenants with their own API
//!    credentials never use it, and an optional override hook has the final say;
//! 2. on a cache hit, return the cached report;
//! 3. otherwise obtain an access token, build the request ([`report::request`]), POST it, and
//!    normalize the response ([`report::response`]);
//! 4. cache non-empty results for the configured TTL (12 hours by default).
//!
//! Failures never surface as `Err`. A missing token or a failed upstream call yields a
//! [`NormalizedReport`] whose `error` field is set; an upstream reply without rows is an empty,
//! successful report.
//!
//! ## Search Console
//!
//! [`Insights::search_console`] derives the bare host from the stored site URL, tries each
//! property variant (`sc-domain:`, `https://`, `https://www.`, ...) in priority order and returns
//! the first one that has data, or else the first one that answered at all.
//!
//! ## Quick Start
//!
//! ```no_run
//! use insightctl::{Config, DateRange, Insights, ReportSpec, StaticAccessToken};
//!
//! # async fn example() -> anyhow::Result<()> {
//! let insights = Insights::new(&Config::default())?;
//! let spec = ReportSpec::builder()
//!     .cache_key_name("top-pages")
//!     .metrics(vec!["sessions".to_string()])
//!     .dimensions(vec!["pagePath".to_string()])
//!     .date_range(DateRange::last_days(28))
//!     .limit(10)
//!     .build();
//!
//! let tokens = StaticAccessToken::new(std::env::var("GA_ACCESS_TOKEN").ok());
//! let report = insights.report(&spec, "123456789", &tokens).await;
//! if let Some(error) = &report.error {
//!     eprintln!("{error}");
//! }
//! # Ok(())
//! # }
//! ```
pub mod auth;
pub mod cache;
pub mod config;
pub mod errors;
pub mod report;
pub mod search_console;
pub mod telemetry;
mod upstream;

pub use auth::{AccessTokenProvider, StaticAccessToken};
pub use config::Config;
pub use errors::{Error, ReportError, Result};
pub use report::{DateRange, NormalizedReport, ReportSpec};

use cache::{CachePolicy, InMemoryReportCache, ReportCache};
use report::fetch::ReportFetcher;
use search_console::{DomainCandidate, SearchConsoleResolver};
use std::sync::Arc;
use tracing::info;

/// Entry point tying the report fetcher, the Search Console resolver and the shared cache
/// together from one [`Config`].
pub struct Insights {
    reports: ReportFetcher,
    search_console: SearchConsoleResolver,
    cache: Arc<InMemoryReportCache>,
}

impl Insights {
    pub fn new(config: &Config) -> Result<Self> {
        Self::with_policy(config, CachePolicy::new(config.credentials.custom_api_keys))
    }

    /// Like [`Insights::new`] but with an explicit cache policy, e.g. one carrying an override
    /// hook. `credentials.custom_api_keys` from `config` still forces caching off before the hook
    /// runs.
    pub fn with_policy(config: &Config, policy: CachePolicy) -> Result<Self> {
        let policy = policy.with_custom_api_keys(config.credentials.custom_api_keys);
        let cache = Arc::new(InMemoryReportCache::new(config.cache.max_capacity));
        let reports = ReportFetcher::new(&config.reporting, cache.clone(), config.cache.ttl, policy)?;
        let search_console = SearchConsoleResolver::new(&config.search_console)?;

        info!(
            reporting = %config.reporting.base_url,
            search_console = %config.search_console.base_url,
            cache_ttl = %humantime::format_duration(config.cache.ttl),
            "Insights client ready"
        );

        Ok(Self {
            reports,
            search_console,
            cache,
        })
    }

    pub async fn report(&self, spec: &ReportSpec, property_id: &str, tokens: &dyn AccessTokenProvider) -> NormalizedReport {
        self.reports.fetch(spec, property_id, tokens).await
    }

    pub async fn search_console(
        &self,
        stored_site_url: &str,
        date_range: &DateRange,
        limit: u32,
        access_token: &str,
    ) -> std::result::Result<DomainCandidate, ReportError> {
        self.search_console
            .resolve_and_query(stored_site_url, date_range, limit, access_token)
            .await
    }

    /// Drop every cached report
    pub async fn clear_cache(&self) {
        self.cache.clear().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::time::Duration;
    use url::Url;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn report_body() -> serde_json::Value {
        json!({
            "dimensionHeaders": [{"name": "pagePath"}],
            "metricHeaders": [{"name": "sessions", "type": "TYPE_INTEGER"}],
            "rows": [{"dimensionValues": [{"value": "/"}], "metricValues": [{"value": "42"}]}],
            "totals": [{"metricValues": [{"value": "42"}]}]
        })
    }

    fn spec() -> ReportSpec {
        ReportSpec::builder()
            .cache_key_name("top-pages")
            .metrics(vec!["sessions".to_string()])
            .dimensions(vec!["pagePath".to_string()])
            .date_range(DateRange::new("2024-01-01", "2024-01-31"))
            .build()
    }

    #[test_log::test(tokio::test)]
    async fn test_configured_custom_keys_survive_an_explicit_policy() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1beta/properties/123:runReport"))
            .respond_with(ResponseTemplate::new(200).set_body_json(report_body()))
            .expect(2)
            .mount(&server)
            .await;

        let mut config = Config::default();
        config.reporting.base_url = Url::parse(&format!("{}/v1beta", server.uri())).unwrap();
        config.reporting.timeout = Duration::from_secs(5);
        config.credentials.custom_api_keys = true;

        let policy = CachePolicy::default().with_override(|use_cache: bool, _: &ReportSpec| use_cache);
        let insights = Insights::with_policy(&config, policy).unwrap();
        let tokens = StaticAccessToken::new(Some("ya29.test".into()));

        let first = insights.report(&spec(), "123", &tokens).await;
        let second = insights.report(&spec(), "123", &tokens).await;

        assert!(first.error.is_none());
        assert_eq!(first.rows, second.rows);
        assert!(insights.cache.is_empty().await);
    }
}
