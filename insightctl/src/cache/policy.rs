//! The per-request decision whether to consult and populate the cache.

use crate::report::ReportSpec;
use std::fmt;
use std::sync::Arc;

/// Extension point that may veto or force caching for a request.
///
/// Receives the decision made so far and returns the final one. Closures of the matching shape
/// implement it directly.
pub trait CacheOverride: Send + Sync {
    fn apply(&self, use_cache: bool, spec: &ReportSpec) -> bool;
}

impl<F> CacheOverride for F
where
    F: Fn(bool, &ReportSpec) -> bool + Send + Sync,
{
    fn apply(&self, use_cache: bool, spec: &ReportSpec) -> bool {
        self(use_cache, spec)
    }
}

#[derive(Clone, Default)]
pub struct CachePolicy {
    /// Caller-supplied API credentials are configured; caching is forced off
    pub custom_api_keys: bool,
    pub override_hook: Option<Arc<dyn CacheOverride>>,
}

impl fmt::Debug for CachePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CachePolicy")
            .field("custom_api_keys", &self.custom_api_keys)
            .field("override_hook", &self.override_hook.is_some())
            .finish()
    }
}

impl CachePolicy {
    pub fn new(custom_api_keys: bool) -> Self {
        Self {
            custom_api_keys,
            override_hook: None,
        }
    }

    /// Force caching off when `custom_api_keys` is set. Never turns the veto back off.
    pub fn with_custom_api_keys(mut self, custom_api_keys: bool) -> Self {
        self.custom_api_keys |= custom_api_keys;
        self
    }

    pub fn with_override(mut self, hook: impl CacheOverride + 'static) -> Self {
        self.override_hook = Some(Arc::new(hook));
        self
    }

    /// Effective cache flag for `spec`: custom credentials force it off, then the hook has the
    /// last word.
    pub fn effective_use_cache(&self, spec: &ReportSpec) -> bool {
        let use_cache = spec.use_cache && !self.custom_api_keys;
        match &self.override_hook {
            Some(hook) => hook.apply(use_cache, spec),
            None => use_cache,
        }
    }
}
