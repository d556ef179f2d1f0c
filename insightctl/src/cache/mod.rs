//! Report cache.
//!
//! The fetcher memoizes successful reports behind the [`ReportCache`] trait. The bundled
//! implementation is [`memory::InMemoryReportCache`]; anything with atomic get/set semantics can
//! stand in for it. Concurrent misses on the same key may both go upstream and the last write
//! wins, which is fine since results for a key are idempotent.

pub mod memory;
pub mod policy;

use crate::report::NormalizedReport;
use async_trait::async_trait;
use sha2::{Digest, Sha256};
use std::time::Duration;

pub use memory::InMemoryReportCache;
pub use policy::{CacheOverride, CachePolicy};

/// Prefix on every derived cache key
pub const CACHE_KEY_PREFIX: &str = "insightctl_report_";

#[async_trait]
pub trait ReportCache: Send + Sync {
    async fn get(&self, key: &str) -> Option<NormalizedReport>;

    async fn set(&self, key: &str, value: NormalizedReport, ttl: Duration);

    /// Drop every cached report
    async fn clear(&self);
}

/// Derive the cache key for a report.
///
/// The key is a SHA-256 over the report name, property and date bounds, each terminated by a NUL
/// byte so neighbouring fields can't run into each other. The same logical report for the same
/// property and window always maps to the same entry.
pub fn cache_key(cache_key_name: &str, property_id: &str, start: &str, end: &str) -> String {
    let mut hasher = Sha256::new();
    for field in [cache_key_name, property_id, start, end] {
        hasher.update(field.as_bytes());
        hasher.update([0u8]);
    }
    format!("{CACHE_KEY_PREFIX}{:x}", hasher.finalize())
}
