//! Integration tests for the in-memory cache engine.

#![allow(
    clippy::min_ident_chars,
    clippy::tests_outside_test_module,
    clippy::missing_panics_doc,
    clippy::expect_used,
    clippy::unwrap_used,
    clippy::float_cmp,
    missing_docs,
    reason = "Integration tests have different conventions"
)]

use chrono::{Duration as ChronoDuration, Utc};
use mimir_cache::{Cache, CacheEntry, CleanupTask, MemoryCache};
use mimir_core::{
    CacheConfig, ChatCompletionRequest, ChatCompletionResponse, Choice, Message, Usage,
};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinSet;
use tokio::time::sleep;

fn response(text: &str) -> ChatCompletionResponse {
    ChatCompletionResponse {
        id: format!("resp-{text}"),
        object: "chat.completion".to_owned(),
        created: 1_700_000_000,
        model: "test-model".to_owned(),
        choices: vec![Choice {
            index: 0,
            message: Message::assistant(text),
            finish_reason: Some("stop".to_owned()),
            logprobs: None,
        }],
        usage: Usage::default(),
        system_fingerprint: None,
    }
}

fn entry(label: &str, embedding: Vec<f64>) -> CacheEntry {
    let request = ChatCompletionRequest::new("test-model", vec![Message::user(label)]);
    CacheEntry::new(request, response(label), embedding, Duration::from_secs(3600))
}

fn entry_expiring_in(label: &str, embedding: Vec<f64>, offset: ChronoDuration) -> CacheEntry {
    let request = ChatCompletionRequest::new("test-model", vec![Message::user(label)]);
    let now = Utc::now();
    let created = now.min(now + offset) - ChronoDuration::seconds(1);
    CacheEntry::with_timestamps(request, response(label), embedding, created, now + offset)
}

fn cache_with_capacity(max_entries: usize) -> MemoryCache {
    MemoryCache::new(&CacheConfig {
        max_entries,
        ttl_seconds: 3600,
        ..CacheConfig::default()
    })
}

fn label_of(entry: &CacheEntry) -> String {
    entry.response.first_text().unwrap_or_default()
}

/// One-hot vector of dimension `dimensions` with a 1 at `index`
fn basis(dimensions: usize, index: usize) -> Vec<f64> {
    let mut vector = vec![0.0; dimensions];
    vector[index] = 1.0;
    vector
}

#[tokio::test]
async fn test_hit_and_miss_scenario() {
    let cache = cache_with_capacity(2);
    cache.set(entry("A", vec![1.0, 0.0, 0.0])).await.unwrap();
    cache.set(entry("B", vec![0.0, 1.0, 0.0])).await.unwrap();

    let hit = cache.get(&[0.99, 0.1, 0.0], 0.9).await.expect("expected a hit on A");
    assert_eq!(label_of(&hit.entry), "A");
    assert!((hit.similarity - 0.995).abs() < 1e-3, "similarity {}", hit.similarity);

    let misses_before = cache.stats().await.total_misses;
    assert!(cache.get(&[0.0, 0.0, 1.0], 0.9).await.is_none());
    let stats = cache.stats().await;
    assert_eq!(stats.total_misses, misses_before + 1);
    assert_eq!(stats.total_hits, 1);
    assert!((stats.hit_rate - 0.5).abs() < 1e-12);
}

#[tokio::test]
async fn test_best_match_wins() {
    let cache = cache_with_capacity(8);
    cache.set(entry("far", vec![1.0, 1.0, 0.0])).await.unwrap();
    cache.set(entry("near", vec![1.0, 0.2, 0.0])).await.unwrap();

    let hit = cache.get(&[1.0, 0.1, 0.0], 0.5).await.unwrap();
    assert_eq!(label_of(&hit.entry), "near");
}

#[tokio::test]
async fn test_capacity_evicts_exactly_one() {
    let capacity = 5;
    let cache = cache_with_capacity(capacity);
    for index in 0..capacity {
        cache
            .set(entry(&format!("e{index}"), basis(capacity + 1, index)))
            .await
            .unwrap();
    }
    assert_eq!(cache.size().await, capacity);

    let before: HashSet<String> = cache.entries().await.iter().map(label_of).collect();
    cache
        .set(entry("extra", basis(capacity + 1, capacity)))
        .await
        .unwrap();
    let after: HashSet<String> = cache.entries().await.iter().map(label_of).collect();

    assert!(cache.size().await <= capacity);
    assert!(after.contains("extra"));
    assert_eq!(before.difference(&after).count(), 1);
}

#[tokio::test]
async fn test_never_hit_entry_is_evicted_before_hit_entry() {
    let cache = cache_with_capacity(2);
    cache.set(entry("A", vec![1.0, 0.0, 0.0])).await.unwrap();
    cache.set(entry("B", vec![0.0, 1.0, 0.0])).await.unwrap();

    // B is hit once, A never
    let hit = cache.get(&[0.0, 1.0, 0.0], 0.9).await.unwrap();
    assert_eq!(label_of(&hit.entry), "B");

    cache.set(entry("C", vec![0.0, 0.0, 1.0])).await.unwrap();

    let labels: Vec<String> = cache.entries().await.iter().map(label_of).collect();
    assert_eq!(labels, vec!["B".to_owned(), "C".to_owned()]);
}

#[tokio::test]
async fn test_least_recently_hit_is_evicted_when_all_hit() {
    let cache = cache_with_capacity(2);
    cache.set(entry("A", vec![1.0, 0.0, 0.0])).await.unwrap();
    cache.set(entry("B", vec![0.0, 1.0, 0.0])).await.unwrap();

    cache.get(&[1.0, 0.0, 0.0], 0.9).await.unwrap();
    sleep(Duration::from_millis(5)).await;
    cache.get(&[0.0, 1.0, 0.0], 0.9).await.unwrap();

    cache.set(entry("C", vec![0.0, 0.0, 1.0])).await.unwrap();
    let labels: Vec<String> = cache.entries().await.iter().map(label_of).collect();
    assert_eq!(labels, vec!["B".to_owned(), "C".to_owned()]);
}

#[tokio::test]
async fn test_near_duplicate_updates_in_place() {
    let cache = cache_with_capacity(4);
    cache.set(entry("original", vec![1.0, 0.0, 0.0])).await.unwrap();
    cache.set(entry("other", vec![0.0, 1.0, 0.0])).await.unwrap();

    cache
        .set(entry("replacement", vec![1.0, 0.05, 0.0]))
        .await
        .unwrap();
    assert_eq!(cache.size().await, 2);

    let hit = cache.get(&[1.0, 0.0, 0.0], 0.9).await.unwrap();
    assert_eq!(label_of(&hit.entry), "replacement");
}

#[tokio::test]
async fn test_delete_near_duplicate() {
    let cache = cache_with_capacity(4);
    cache.set(entry("A", vec![1.0, 0.0, 0.0])).await.unwrap();
    cache.set(entry("B", vec![0.0, 1.0, 0.0])).await.unwrap();

    assert!(!cache.delete(&[0.7, 0.7, 0.0]).await.unwrap());
    assert_eq!(cache.size().await, 2);

    assert!(cache.delete(&[1.0, 0.01, 0.0]).await.unwrap());
    assert_eq!(cache.size().await, 1);
    assert!(cache.get(&[1.0, 0.0, 0.0], 0.9).await.is_none());
}

#[tokio::test]
async fn test_cleanup_removes_only_expired() {
    let cache = cache_with_capacity(8);
    cache
        .set(entry_expiring_in("expired-1", basis(4, 0), ChronoDuration::seconds(-10)))
        .await
        .unwrap();
    cache
        .set(entry_expiring_in("live-1", basis(4, 1), ChronoDuration::hours(1)))
        .await
        .unwrap();
    cache
        .set(entry_expiring_in("expired-2", basis(4, 2), ChronoDuration::milliseconds(-1)))
        .await
        .unwrap();
    cache
        .set(entry_expiring_in("live-2", basis(4, 3), ChronoDuration::hours(2)))
        .await
        .unwrap();

    assert_eq!(cache.cleanup().await, 2);
    let labels: Vec<String> = cache.entries().await.iter().map(label_of).collect();
    assert_eq!(labels, vec!["live-1".to_owned(), "live-2".to_owned()]);

    assert_eq!(cache.cleanup().await, 0);
    assert_eq!(cache.size().await, 2);
}

#[tokio::test]
async fn test_clear_resets_everything() {
    let cache = cache_with_capacity(4);
    cache.set(entry("A", vec![1.0, 0.0])).await.unwrap();
    cache.get(&[1.0, 0.0], 0.9).await.unwrap();
    assert!(cache.get(&[0.0, 1.0], 0.9).await.is_none());

    cache.clear().await.unwrap();

    assert_eq!(cache.size().await, 0);
    let stats = cache.stats().await;
    assert_eq!(stats.total_entries, 0);
    assert_eq!(stats.total_hits, 0);
    assert_eq!(stats.total_misses, 0);
    assert_eq!(stats.hit_rate, 0.0);
    assert_eq!(stats.estimated_saved, 0.0);
}

#[tokio::test]
async fn test_estimated_savings_follow_hits() {
    let cache = MemoryCache::new(&CacheConfig {
        cost_per_hit: 0.01,
        ..CacheConfig::default()
    });
    cache.set(entry("A", vec![1.0, 0.0])).await.unwrap();
    for _ in 0..4 {
        cache.get(&[1.0, 0.0], 0.9).await.unwrap();
    }
    let stats = cache.stats().await;
    assert!((stats.estimated_saved - 0.04).abs() < 1e-12);
    assert!((stats.avg_similarity - 1.0).abs() < 1e-12);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_lookups_record_every_hit() {
    let cache = Arc::new(cache_with_capacity(16));
    for index in 0..4 {
        cache
            .set(entry(&format!("e{index}"), basis(8, index)))
            .await
            .unwrap();
    }

    let mut join_set = JoinSet::new();
    for worker in 0..8_usize {
        let cache = Arc::clone(&cache);
        join_set.spawn(async move {
            for round in 0..50_usize {
                let query = basis(8, (worker + round) % 4);
                assert!(cache.get(&query, 0.9).await.is_some());
                // Interleave writes that never touch the queried entries
                if round % 10 == 0 {
                    cache
                        .set(entry("writer", basis(8, 4 + worker % 4)))
                        .await
                        .unwrap();
                }
            }
        });
    }
    while let Some(joined) = join_set.join_next().await {
        joined.unwrap();
    }

    let stats = cache.stats().await;
    assert_eq!(stats.total_hits, 400);
    assert_eq!(stats.total_misses, 0);

    let recorded: u64 = cache
        .entries()
        .await
        .iter()
        .filter(|stored| label_of(stored) != "writer")
        .map(CacheEntry::hit_count)
        .sum();
    assert_eq!(recorded, stats.total_hits);
}

#[tokio::test]
async fn test_cleanup_task_sweeps_expired_entries() {
    let cache = Arc::new(cache_with_capacity(8));
    cache
        .set(entry_expiring_in("short", basis(2, 0), ChronoDuration::milliseconds(30)))
        .await
        .unwrap();
    cache
        .set(entry_expiring_in("long", basis(2, 1), ChronoDuration::hours(1)))
        .await
        .unwrap();

    let shared: Arc<dyn Cache> = Arc::<MemoryCache>::clone(&cache);
    let task = CleanupTask::start(shared, Duration::from_millis(20));

    let mut remaining = cache.size().await;
    for _ in 0..50 {
        if remaining == 1 {
            break;
        }
        sleep(Duration::from_millis(20)).await;
        remaining = cache.size().await;
    }
    assert_eq!(remaining, 1);
    assert!(task.is_running());

    task.stop().await;
    let labels: Vec<String> = cache.entries().await.iter().map(label_of).collect();
    assert_eq!(labels, vec!["long".to_owned()]);
}
