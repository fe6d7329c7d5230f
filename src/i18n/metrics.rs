//! Process-wide counters for cache effectiveness and backend health.

use serde::Serialize;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::OnceLock;

const COUNTERS: usize = 5;

/// What happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Counter {
    /// A translation was served from the cache
    CacheHit,
    /// A translation had to be requested
    CacheMiss,
    /// A request was sent to a translation backend
    BackendCall,
    /// A backend request failed
    BackendFailure,
    /// Rate-limited work was handed to the fallback backend
    Fallback,
}

impl Counter {
    fn slot(self) -> usize {
        self as usize
    }
}

#[derive(Debug, Default)]
pub struct TranslationMetrics {
    counts: [AtomicUsize; COUNTERS],
}

static METRICS: OnceLock<TranslationMetrics> = OnceLock::new();

impl TranslationMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// The instance the cache, localizations and backends record into.
    pub fn global() -> &'static TranslationMetrics {
        METRICS.get_or_init(TranslationMetrics::new)
    }

    pub fn record(&self, counter: Counter) {
        self.counts[counter.slot()].fetch_add(1, Ordering::Relaxed);
    }

    pub fn count(&self, counter: Counter) -> usize {
        self.counts[counter.slot()].load(Ordering::Relaxed)
    }

    pub fn report(&self) -> MetricsReport {
        let cache_hits = self.count(Counter::CacheHit);
        let cache_misses = self.count(Counter::CacheMiss);
        let backend_calls = self.count(Counter::BackendCall);
        let backend_failures = self.count(Counter::BackendFailure).min(backend_calls);

        MetricsReport {
            cache_hits,
            cache_misses,
            cache_hit_rate: percent(cache_hits, cache_hits + cache_misses),
            backend_calls,
            backend_failures,
            backend_success_rate: percent(backend_calls - backend_failures, backend_calls),
            fallbacks: self.count(Counter::Fallback),
        }
    }
}

/// Snapshot of the counters, logged by the warm-up job.
#[derive(Debug, Clone, Serialize)]
pub struct MetricsReport {
    pub cache_hits: usize,
    pub cache_misses: usize,
    /// 0-100
    pub cache_hit_rate: f64,
    pub backend_calls: usize,
    pub backend_failures: usize,
    /// 0-100
    pub backend_success_rate: f64,
    pub fallbacks: usize,
}

fn percent(part: usize, whole: usize) -> f64 {
    if whole == 0 {
        0.0
    } else {
        part as f64 * 100.0 / whole as f64
    }
}
