//! Semantic response cache engine.
//!
//! Responses are keyed by the embedding of the request that produced them. A
//! lookup returns the stored entry whose embedding is most similar to the
//! query, provided the similarity reaches the caller's threshold.
//!
//! - [`similarity`]: cosine similarity, Euclidean distance, normalization
//! - [`CacheEntry`] / [`CacheStats`]: stored records and statistics
//! - [`Cache`]: the contract every storage backend implements
//! - [`MemoryCache`]: the in-memory engine
//! - [`CleanupTask`]: periodic expiry sweep with explicit start/stop

/// Background expiry sweep.
pub mod cleanup;
/// Cache entry model.
pub mod entry;
/// In-memory cache engine.
pub mod memory;
/// Vector similarity functions.
pub mod similarity;
/// Cache statistics.
pub mod stats;
/// The cache contract.
pub mod traits;

pub use cleanup::CleanupTask;
pub use entry::{CacheEntry, CacheHit, EntryId};
pub use memory::MemoryCache;
pub use similarity::{cosine_similarity, euclidean_distance, normalize};
pub use stats::CacheStats;
pub use traits::{Cache, NEAR_DUPLICATE_SIMILARITY};
