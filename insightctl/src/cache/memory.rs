//! In-process report cache on top of `moka`.

use super::ReportCache;
use crate::report::NormalizedReport;
use async_trait::async_trait;
use moka::Expiry;
use moka::future::Cache;
use std::time::{Duration, Instant};

#[derive(Debug, Clone)]
struct CachedReport {
    report: NormalizedReport,
    ttl: Duration,
}

/// Expires each entry after the TTL it was written with.
struct PerEntryTtl;

impl Expiry<String, CachedReport> for PerEntryTtl {
    fn expire_after_create(&self, _key: &String, value: &CachedReport, _created_at: Instant) -> Option<Duration> {
        Some(value.ttl)
    }
}

/// Bounded, TTL-aware cache of normalized reports.
#[derive(Clone)]
pub struct InMemoryReportCache {
    inner: Cache<String, CachedReport>,
}

impl InMemoryReportCache {
    pub fn new(max_capacity: u64) -> Self {
        let inner = Cache::builder().max_capacity(max_capacity).expire_after(PerEntryTtl).build();
        Self { inner }
    }

    /// Number of live entries. Pending maintenance is flushed first so the count is exact.
    pub async fn len(&self) -> u64 {
        self.inner.run_pending_tasks().await;
        self.inner.entry_count()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait]
impl ReportCache for InMemoryReportCache {
    async fn get(&self, key: &str) -> Option<NormalizedReport> {
        self.inner.get(key).await.map(|cached| cached.report)
    }

    async fn set(&self, key: &str, value: NormalizedReport, ttl: Duration) {
        self.inner
            .insert(key.to_string(), CachedReport { report: value, ttl })
            .await;
    }

    async fn clear(&self) {
        self.inner.invalidate_all();
        self.inner.run_pending_tasks().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report(header: &str) -> NormalizedReport {
        NormalizedReport {
            headers: vec![header.to_string()],
            ..NormalizedReport::default()
        }
    }

    #[tokio::test]
    async fn test_set_then_get() {
        let cache = InMemoryReportCache::new(100);
        assert!(cache.get("k").await.is_none());

        cache.set("k", report("sessions"), Duration::from_secs(60)).await;
        assert_eq!(cache.get("k").await, Some(report("sessions")));
        assert_eq!(cache.len().await, 1);
    }

    #[tokio::test]
    async fn test_entries_expire_after_their_own_ttl() {
        let cache = InMemoryReportCache::new(100);
        cache.set("short", report("a"), Duration::from_millis(50)).await;
        cache.set("long", report("b"), Duration::from_secs(60)).await;

        tokio::time::sleep(Duration::from_millis(150)).await;

        assert!(cache.get("short").await.is_none());
        assert_eq!(cache.get("long").await, Some(report("b")));
    }

    #[tokio::test]
    async fn test_clear_drops_everything() {
        let cache = InMemoryReportCache::new(100);
        cache.set("a", report("a"), Duration::from_secs(60)).await;
        cache.set("b", report("b"), Duration::from_secs(60)).await;

        cache.clear().await;

        assert!(cache.is_empty().await);
        assert!(cache.get("a").await.is_none());
    }
}
