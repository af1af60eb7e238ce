//! In-memory semantic cache engine.
//!
//! Entries live in insertion order in a single vector behind one
//! reader-writer lock. Lookups compare the query against every entry, which is
//! acceptable because capacity is small and bounded by configuration.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use mimir_core::{CacheConfig, Result};
use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};
use tokio::sync::RwLock;
use tracing::debug;

use crate::similarity::cosine_similarity;
use crate::stats::HitCounters;
use crate::traits::NEAR_DUPLICATE_SIMILARITY;
use crate::{Cache, CacheEntry, CacheHit, CacheStats, EntryId};

/// `last_hit_micros` value of an entry that has never been hit.
///
/// Sorts before every real timestamp, so never-hit entries are evicted first.
const NEVER_HIT: i64 = i64::MIN;

/// An entry as held by the engine.
///
/// Hit bookkeeping is atomic so `get` can record a hit on the matched entry
/// while holding only the shared lock.
#[derive(Debug)]
struct StoredEntry {
    id: EntryId,
    entry: CacheEntry,
    hit_count: AtomicU64,
    last_hit_micros: AtomicI64,
}

impl StoredEntry {
    fn new(entry: CacheEntry) -> Self {
        let (hit_count, last_hit_micros) = Self::bookkeeping_of(&entry);
        Self {
            id: EntryId::new(),
            entry,
            hit_count: AtomicU64::new(hit_count),
            last_hit_micros: AtomicI64::new(last_hit_micros),
        }
    }

    fn bookkeeping_of(entry: &CacheEntry) -> (u64, i64) {
        let last_hit = entry
            .last_hit_at()
            .map_or(NEVER_HIT, |time| time.timestamp_micros());
        (entry.hit_count(), last_hit)
    }

    /// Overwrite contents in place, keeping the id
    fn replace(&mut self, entry: CacheEntry) {
        let (hit_count, last_hit_micros) = Self::bookkeeping_of(&entry);
        *self.hit_count.get_mut() = hit_count;
        *self.last_hit_micros.get_mut() = last_hit_micros;
        self.entry = entry;
    }

    fn record_hit(&self, now: DateTime<Utc>) {
        self.hit_count.fetch_add(1, Ordering::Relaxed);
        self.last_hit_micros
            .fetch_max(now.timestamp_micros(), Ordering::Relaxed);
    }

    fn last_hit_micros(&self) -> i64 {
        self.last_hit_micros.load(Ordering::Relaxed)
    }

    fn snapshot(&self) -> CacheEntry {
        let last_hit = self.last_hit_micros();
        let last_hit_at = if last_hit == NEVER_HIT {
            None
        } else {
            DateTime::from_timestamp_micros(last_hit)
        };
        self.entry.clone().with_bookkeeping(
            self.id,
            self.hit_count.load(Ordering::Relaxed),
            last_hit_at,
        )
    }
}

/// In-memory semantic cache with capacity-bounded eviction.
pub struct MemoryCache {
    entries: RwLock<Vec<StoredEntry>>,
    counters: HitCounters,
    capacity: usize,
    cost_per_hit: f64,
}

impl MemoryCache {
    /// Creates an empty cache sized by `config.max_entries`
    ///
    /// Expired entries are only removed by [`Cache::cleanup`]; pair the cache
    /// with a [`CleanupTask`](crate::CleanupTask) to sweep them periodically.
    pub fn new(config: &CacheConfig) -> Self {
        let capacity = config.max_entries.max(1);
        Self {
            entries: RwLock::new(Vec::with_capacity(capacity.min(1024))),
            counters: HitCounters::default(),
            capacity,
            cost_per_hit: config.cost_per_hit,
        }
    }

    /// Maximum number of entries held before eviction
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Snapshots of all stored entries in storage order, expired ones included
    pub async fn entries(&self) -> Vec<CacheEntry> {
        self.entries
            .read()
            .await
            .iter()
            .map(StoredEntry::snapshot)
            .collect()
    }

    /// Position of the first entry that is a near-duplicate of `embedding`
    fn find_near_duplicate(entries: &[StoredEntry], embedding: &[f64]) -> Option<usize> {
        entries.iter().position(|stored| {
            cosine_similarity(embedding, &stored.entry.embedding) > NEAR_DUPLICATE_SIMILARITY
        })
    }

    /// Remove the entry with the earliest last hit, never-hit entries first.
    /// Ties go to the entry stored earliest.
    fn evict_one(entries: &mut Vec<StoredEntry>) {
        let Some(position) = entries
            .iter()
            .enumerate()
            .min_by_key(|(_, stored)| stored.last_hit_micros())
            .map(|(position, _)| position)
        else {
            return;
        };

        let evicted = entries.remove(position);
        debug!(
            id = %evicted.id,
            hits = evicted.hit_count.load(Ordering::Relaxed),
            "evicted cache entry"
        );
    }
}

impl Default for MemoryCache {
    fn default() -> Self {
        Self::new(&CacheConfig::default())
    }
}

#[async_trait]
impl Cache for MemoryCache {
    async fn get(&self, embedding: &[f64], threshold: f64) -> Option<CacheHit> {
        let entries = self.entries.read().await;
        let now = Utc::now();

        let mut best: Option<(&StoredEntry, f64)> = None;
        for stored in entries.iter() {
            if stored.entry.is_expired_at(now) {
                continue;
            }
            let similarity = cosine_similarity(embedding, &stored.entry.embedding);
            // Malformed vectors score 0 and never match, whatever the threshold
            let matches = similarity > 0.0 && similarity >= threshold;
            if !matches {
                continue;
            }
            // Strictly greater replaces, so the earliest entry wins ties
            if best.is_none_or(|(_, best_similarity)| similarity > best_similarity) {
                best = Some((stored, similarity));
            }
        }

        let Some((stored, similarity)) = best else {
            self.counters.record_miss();
            debug!(scanned = entries.len(), "cache miss");
            return None;
        };

        // Recorded before the shared lock is released, so a concurrent
        // removal can never race with the bookkeeping.
        stored.record_hit(now);
        self.counters.record_hit(similarity);
        debug!(id = %stored.id, similarity, "cache hit");

        Some(CacheHit {
            entry: stored.snapshot(),
            similarity,
        })
    }

    async fn set(&self, entry: CacheEntry) -> Result<()> {
        let mut entries = self.entries.write().await;

        if let Some(position) = Self::find_near_duplicate(&entries, &entry.embedding) {
            let stored = &mut entries[position];
            stored.replace(entry);
            debug!(id = %stored.id, "updated near-duplicate cache entry");
            return Ok(());
        }

        if entries.len() >= self.capacity {
            Self::evict_one(&mut entries);
        }

        let stored = StoredEntry::new(entry);
        debug!(id = %stored.id, entries = entries.len() + 1, "stored cache entry");
        entries.push(stored);
        Ok(())
    }

    async fn delete(&self, embedding: &[f64]) -> Result<bool> {
        let mut entries = self.entries.write().await;

        let Some(position) = Self::find_near_duplicate(&entries, embedding) else {
            return Ok(false);
        };
        let removed = entries.remove(position);
        debug!(id = %removed.id, "deleted cache entry");
        Ok(true)
    }

    async fn clear(&self) -> Result<()> {
        let mut entries = self.entries.write().await;
        entries.clear();
        self.counters.reset();
        debug!("cleared cache");
        Ok(())
    }

    async fn stats(&self) -> CacheStats {
        let total_entries = self.entries.read().await.len();
        self.counters.snapshot(total_entries, self.cost_per_hit)
    }

    async fn cleanup(&self) -> usize {
        let mut entries = self.entries.write().await;
        let now = Utc::now();
        let before = entries.len();
        entries.retain(|stored| !stored.entry.is_expired_at(now));
        before - entries.len()
    }

    async fn size(&self) -> usize {
        self.entries.read().await.len()
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
    use chrono::Duration as ChronoDuration;
    use mimir_core::{ChatCompletionRequest, ChatCompletionResponse, Message, Usage};
    use std::time::Duration;

    fn make_entry(embedding: Vec<f64>) -> CacheEntry {
        let request = ChatCompletionRequest::new("test-model", vec![Message::user("prompt")]);
        let response = ChatCompletionResponse {
            id: "resp".to_owned(),
            object: "chat.completion".to_owned(),
            created: 0,
            model: "test-model".to_owned(),
            choices: Vec::new(),
            usage: Usage::default(),
            system_fingerprint: None,
        };
        CacheEntry::new(request, response, embedding, Duration::from_secs(3600))
    }

    fn small_cache(max_entries: usize) -> MemoryCache {
        MemoryCache::new(&CacheConfig {
            max_entries,
            ..CacheConfig::default()
        })
    }

    #[tokio::test]
    async fn test_zero_capacity_is_treated_as_one() {
        let cache = small_cache(0);
        assert_eq!(cache.capacity(), 1);
        cache.set(make_entry(vec![1.0, 0.0])).await.unwrap();
        cache.set(make_entry(vec![0.0, 1.0])).await.unwrap();
        assert_eq!(cache.size().await, 1);
    }

    #[tokio::test]
    async fn test_hit_snapshot_includes_current_hit() {
        let cache = small_cache(4);
        cache.set(make_entry(vec![1.0, 0.0])).await.unwrap();

        let first = cache.get(&[1.0, 0.0], 0.9).await.unwrap();
        assert_eq!(first.entry.hit_count(), 1);
        assert!(first.entry.last_hit_at().is_some());
        assert!(first.entry.id().is_some());

        let second = cache.get(&[1.0, 0.0], 0.9).await.unwrap();
        assert_eq!(second.entry.hit_count(), 2);
        assert_eq!(second.entry.id(), first.entry.id());
        assert!(second.entry.last_hit_at() >= first.entry.last_hit_at());
    }

    #[tokio::test]
    async fn test_ties_go_to_earliest_entry() {
        let cache = small_cache(4);
        // Two entries equally similar to the query but not near-duplicates of each other
        let mut first = make_entry(vec![1.0, 1.0, 0.0]);
        first.response.id = "first".to_owned();
        let mut second = make_entry(vec![1.0, 0.0, 1.0]);
        second.response.id = "second".to_owned();
        cache.set(first).await.unwrap();
        cache.set(second).await.unwrap();

        for _ in 0..3 {
            let hit = cache.get(&[1.0, 0.0, 0.0], 0.5).await.unwrap();
            assert_eq!(hit.entry.response.id, "first");
        }
    }

    #[tokio::test]
    async fn test_expired_entries_are_skipped_not_removed() {
        let cache = small_cache(4);
        let live = make_entry(vec![1.0, 0.0]);
        let now = Utc::now();
        let expired = CacheEntry::with_timestamps(
            live.request.clone(),
            live.response.clone(),
            vec![0.0, 1.0],
            now - ChronoDuration::hours(2),
            now - ChronoDuration::hours(1),
        );
        cache.set(expired).await.unwrap();

        assert!(cache.get(&[0.0, 1.0], 0.9).await.is_none());
        assert_eq!(cache.size().await, 1);
        assert_eq!(cache.stats().await.total_misses, 1);
    }

    #[tokio::test]
    async fn test_dedup_keeps_id_and_position() {
        let cache = small_cache(4);
        cache.set(make_entry(vec![1.0, 0.0, 0.0])).await.unwrap();
        cache.set(make_entry(vec![0.0, 1.0, 0.0])).await.unwrap();
        let original_id = cache.entries().await[0].id();

        let mut update = make_entry(vec![1.0, 0.001, 0.0]);
        update.response.id = "updated".to_owned();
        cache.set(update).await.unwrap();

        let entries = cache.entries().await;
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].id(), original_id);
        assert_eq!(entries[0].response.id, "updated");
    }

    #[tokio::test]
    async fn test_mismatched_dimensions_never_match() {
        let cache = small_cache(4);
        cache.set(make_entry(vec![1.0, 0.0, 0.0])).await.unwrap();
        assert!(cache.get(&[1.0, 0.0], 0.1).await.is_none());
        assert!(cache.get(&[], 0.1).await.is_none());
        assert!(!cache.delete(&[1.0, 0.0]).await.unwrap());
    }

    #[tokio::test]
    async fn test_malformed_queries_miss_at_any_threshold() {
        let cache = small_cache(4);
        cache.set(make_entry(vec![1.0, 0.0, 0.0])).await.unwrap();

        for threshold in [0.0, -1.0, f64::NAN] {
            assert!(cache.get(&[1.0, 0.0], threshold).await.is_none());
            assert!(cache.get(&[0.0, 0.0, 0.0], threshold).await.is_none());
            assert!(cache.get(&[], threshold).await.is_none());
        }
        // Orthogonal vectors score exactly 0 and are not a match either
        assert!(cache.get(&[0.0, 1.0, 0.0], 0.0).await.is_none());

        let stats = cache.stats().await;
        assert_eq!(stats.total_hits, 0);
        assert_eq!(stats.total_misses, 10);
        assert_eq!(stats.hit_rate, 0.0);
    }

    #[tokio::test]
    async fn test_nan_threshold_rejects_real_matches() {
        let cache = small_cache(4);
        cache.set(make_entry(vec![1.0, 0.0, 0.0])).await.unwrap();
        assert!(cache.get(&[1.0, 0.0, 0.0], f64::NAN).await.is_none());
        assert!(cache.get(&[1.0, 0.0, 0.0], 0.0).await.is_some());
    }
}
