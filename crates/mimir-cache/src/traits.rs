//! The storage contract every cache backend implements.

use async_trait::async_trait;
use mimir_core::Result;

use crate::{CacheEntry, CacheHit, CacheStats};

/// Similarity threshold above which two embeddings count as the same request.
pub const NEAR_DUPLICATE_SIMILARITY: f64 = 0.99;

/// Storage backend for semantically matched responses.
///
/// Lookups and reads never fail. Write operations return `Result` so that
/// backends living outside the process can report failures; the in-memory
/// engine always succeeds. Dropping a returned future abandons the call.
#[async_trait]
pub trait Cache: Send + Sync {
    /// Finds the live entry most similar to `embedding` with similarity of at
    /// least `threshold`, recording the hit on it.
    ///
    /// Only positive similarities match, so a malformed or orthogonal query
    /// misses even with a threshold of zero, a negative one, or NaN.
    async fn get(&self, embedding: &[f64], threshold: f64) -> Option<CacheHit>;

    /// Stores an entry, updating a near-duplicate in place if one exists.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot persist the entry.
    async fn set(&self, entry: CacheEntry) -> Result<()>;

    /// Removes the entry whose embedding is a near-duplicate of `embedding`.
    ///
    /// Returns whether an entry was removed.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot perform the removal.
    async fn delete(&self, embedding: &[f64]) -> Result<bool>;

    /// Removes every entry and resets the hit and miss counters.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot perform the removal.
    async fn clear(&self) -> Result<()>;

    /// Returns a snapshot of the cache statistics.
    async fn stats(&self) -> CacheStats;

    /// Removes expired entries and returns how many were removed.
    async fn cleanup(&self) -> usize;

    /// Returns the number of stored entries.
    async fn size(&self) -> usize;
}
