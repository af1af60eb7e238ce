//! Cache statistics and the lock-free counters behind them.

use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};

/// Point-in-time cache statistics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct CacheStats {
    /// Number of stored entries, including expired ones not yet cleaned up
    pub total_entries: usize,
    /// Lookups answered from the cache
    pub total_hits: u64,
    /// Lookups that found no match
    pub total_misses: u64,
    /// `hits / (hits + misses)`, or `0` before the first lookup
    pub hit_rate: f64,
    /// Mean similarity of all hits, or `0` before the first hit
    pub avg_similarity: f64,
    /// Estimated upstream spend avoided, in USD
    #[serde(rename = "estimated_saved_usd")]
    pub estimated_saved: f64,
}

/// Hit and miss counters updated without the entry lock.
#[derive(Debug, Default)]
pub(crate) struct HitCounters {
    hits: AtomicU64,
    misses: AtomicU64,
    /// Sum of hit similarities, stored as `f64` bits
    similarity_sum: AtomicU64,
}

impl HitCounters {
    pub(crate) fn record_hit(&self, similarity: f64) {
        self.hits.fetch_add(1, Ordering::Relaxed);
        // The closure always returns `Some`, so the update cannot fail.
        let _previous = self
            .similarity_sum
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |bits| {
                Some((f64::from_bits(bits) + similarity).to_bits())
            });
    }

    pub(crate) fn record_miss(&self) {
        self.misses.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn reset(&self) {
        self.hits.store(0, Ordering::Relaxed);
        self.misses.store(0, Ordering::Relaxed);
        self.similarity_sum.store(0.0_f64.to_bits(), Ordering::Relaxed);
    }

    pub(crate) fn snapshot(&self, total_entries: usize, cost_per_hit: f64) -> CacheStats {
        let hits = self.hits.load(Ordering::Relaxed);
        let misses = self.misses.load(Ordering::Relaxed);
        let similarity_sum = f64::from_bits(self.similarity_sum.load(Ordering::Relaxed));
        let total = hits + misses;

        let hit_rate = if total > 0 {
            hits as f64 / total as f64
        } else {
            0.0
        };
        let avg_similarity = if hits > 0 {
            similarity_sum / hits as f64
        } else {
            0.0
        };

        CacheStats {
            total_entries,
            total_hits: hits,
            total_misses: misses,
            hit_rate,
            avg_similarity,
            estimated_saved: hits as f64 * cost_per_hit,
        }
    }
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::float_cmp,
    reason = "Test code is allowed to use unwrap and has different conventions"
)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_counters() {
        let stats = HitCounters::default().snapshot(0, 0.001);
        assert_eq!(stats, CacheStats::default());
    }

    #[test]
    fn test_rates_and_savings() {
        let counters = HitCounters::default();
        counters.record_hit(0.98);
        counters.record_hit(0.96);
        counters.record_hit(1.0);
        counters.record_miss();

        let stats = counters.snapshot(3, 0.002);
        assert_eq!(stats.total_entries, 3);
        assert_eq!(stats.total_hits, 3);
        assert_eq!(stats.total_misses, 1);
        assert!((stats.hit_rate - 0.75).abs() < 1e-12);
        assert!((stats.avg_similarity - 0.98).abs() < 1e-12);
        assert!((stats.estimated_saved - 0.006).abs() < 1e-12);
    }

    #[test]
    fn test_reset() {
        let counters = HitCounters::default();
        counters.record_hit(0.9);
        counters.record_miss();
        counters.reset();
        assert_eq!(counters.snapshot(0, 1.0), CacheStats::default());
    }

    #[test]
    fn test_serialized_field_names() {
        let value = serde_json::to_value(CacheStats::default()).unwrap();
        assert!(value.get("estimated_saved_usd").is_some());
        assert!(value.get("hit_rate").is_some());
    }
}
