//! Cached request/response records.

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use mimir_core::{ChatCompletionRequest, ChatCompletionResponse};
use serde::Serialize;
use std::fmt;
use std::time::Duration;
use uuid::Uuid;

/// Stable identifier of a stored entry.
///
/// Assigned by the cache when an entry is first stored and kept across
/// in-place updates of near-duplicate entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct EntryId(Uuid);

impl EntryId {
    pub(crate) fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for EntryId {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(formatter, "{}", self.0)
    }
}

/// A cached response together with the request that produced it.
///
/// Values handed out by a cache are snapshots: changing one never affects
/// the stored entry. Hit bookkeeping is maintained by the cache and is
/// read-only from outside this crate.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CacheEntry {
    /// Original request
    pub request: ChatCompletionRequest,
    /// Response replayed on a hit
    pub response: ChatCompletionResponse,
    /// Embedding of the request prompt
    pub embedding: Vec<f64>,
    created_at: DateTime<Utc>,
    expires_at: DateTime<Utc>,
    id: Option<EntryId>,
    hit_count: u64,
    last_hit_at: Option<DateTime<Utc>>,
}

impl CacheEntry {
    /// Creates an entry created now that expires after `ttl`
    pub fn new(
        request: ChatCompletionRequest,
        response: ChatCompletionResponse,
        embedding: Vec<f64>,
        ttl: Duration,
    ) -> Self {
        let created_at = Utc::now();
        let ttl = ChronoDuration::from_std(ttl).unwrap_or(ChronoDuration::MAX);
        let expires_at = created_at
            .checked_add_signed(ttl)
            .unwrap_or(DateTime::<Utc>::MAX_UTC);
        Self::with_timestamps(request, response, embedding, created_at, expires_at)
    }

    /// Creates an entry with explicit timestamps
    ///
    /// An `expires_at` earlier than `created_at` is raised to `created_at`.
    pub fn with_timestamps(
        request: ChatCompletionRequest,
        response: ChatCompletionResponse,
        embedding: Vec<f64>,
        created_at: DateTime<Utc>,
        expires_at: DateTime<Utc>,
    ) -> Self {
        Self {
            request,
            response,
            embedding,
            created_at,
            expires_at: expires_at.max(created_at),
            id: None,
            hit_count: 0,
            last_hit_at: None,
        }
    }

    /// When the entry was created
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// When the entry expires
    pub fn expires_at(&self) -> DateTime<Utc> {
        self.expires_at
    }

    /// Identifier assigned by the cache; `None` until the entry has been stored
    pub fn id(&self) -> Option<EntryId> {
        self.id
    }

    /// Number of lookups this entry has answered
    pub fn hit_count(&self) -> u64 {
        self.hit_count
    }

    /// Time of the most recent hit, `None` if never hit
    pub fn last_hit_at(&self) -> Option<DateTime<Utc>> {
        self.last_hit_at
    }

    /// Whether the entry is expired at `now` (expiry time inclusive)
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }

    /// Snapshot with cache-maintained fields filled in
    pub(crate) fn with_bookkeeping(
        mut self,
        id: EntryId,
        hit_count: u64,
        last_hit_at: Option<DateTime<Utc>>,
    ) -> Self {
        self.id = Some(id);
        self.hit_count = hit_count;
        self.last_hit_at = last_hit_at;
        self
    }
}

/// A successful similarity lookup.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CacheHit {
    /// Snapshot of the matched entry, including the hit just recorded
    pub entry: CacheEntry,
    /// Cosine similarity between the query and the entry embedding
    pub similarity: f64,
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
    use mimir_core::{Message, Usage};

    fn sample_entry(ttl: Duration) -> CacheEntry {
        let request = ChatCompletionRequest::new("gpt-4o", vec![Message::user("hi")]);
        let response = ChatCompletionResponse {
            id: "chatcmpl-1".to_owned(),
            object: "chat.completion".to_owned(),
            created: 0,
            model: "gpt-4o".to_owned(),
            choices: Vec::new(),
            usage: Usage::default(),
            system_fingerprint: None,
        };
        CacheEntry::new(request, response, vec![1.0, 0.0], ttl)
    }

    #[test]
    fn test_new_entry_has_no_hits() {
        let entry = sample_entry(Duration::from_secs(60));
        assert_eq!(entry.hit_count(), 0);
        assert!(entry.last_hit_at().is_none());
        assert!(entry.id().is_none());
        assert_eq!(
            entry.expires_at() - entry.created_at(),
            ChronoDuration::seconds(60)
        );
    }

    #[test]
    fn test_expiry_is_inclusive() {
        let entry = sample_entry(Duration::from_secs(60));
        assert!(!entry.is_expired_at(entry.created_at()));
        assert!(entry.is_expired_at(entry.expires_at()));
        assert!(entry.is_expired_at(entry.expires_at() + ChronoDuration::seconds(1)));
    }

    #[test]
    fn test_expires_at_never_precedes_created_at() {
        let base = sample_entry(Duration::ZERO);
        let created = Utc::now();
        let entry = CacheEntry::with_timestamps(
            base.request,
            base.response,
            base.embedding,
            created,
            created - ChronoDuration::hours(1),
        );
        assert_eq!(entry.expires_at(), created);
    }

    #[test]
    fn test_huge_ttl_saturates() {
        let entry = sample_entry(Duration::from_secs(u64::MAX));
        assert!(entry.expires_at() > entry.created_at());
    }
}
