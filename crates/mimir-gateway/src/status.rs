use serde::Serialize;

/// Header carrying the cache outcome.
pub const CACHE_HEADER: &str = "X-Mimir-Cache";
/// Header carrying the match similarity on hits.
pub const SIMILARITY_HEADER: &str = "X-Mimir-Similarity";

/// How a request was served.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum CacheOutcome {
    /// Replayed from the cache
    Hit,
    /// Forwarded upstream; the response may be cached afterwards
    Miss,
    /// Not eligible for caching
    Bypass,
}

impl CacheOutcome {
    /// Header value for this outcome
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Hit => "HIT",
            Self::Miss => "MISS",
            Self::Bypass => "BYPASS",
        }
    }
}

/// Cache-status metadata attached to a response for observability.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CacheStatus {
    /// Outcome of the lookup
    pub outcome: CacheOutcome,
    /// Similarity of the matched entry, hits only
    pub similarity: Option<f64>,
}

impl CacheStatus {
    /// Status of a hit with the given similarity
    pub const fn hit(similarity: f64) -> Self {
        Self {
            outcome: CacheOutcome::Hit,
            similarity: Some(similarity),
        }
    }

    /// Status of a miss
    pub const fn miss() -> Self {
        Self {
            outcome: CacheOutcome::Miss,
            similarity: None,
        }
    }

    /// Status of a request that skipped the cache
    pub const fn bypass() -> Self {
        Self {
            outcome: CacheOutcome::Bypass,
            similarity: None,
        }
    }

    /// Whether the response came from the cache
    pub fn is_hit(&self) -> bool {
        self.outcome == CacheOutcome::Hit
    }

    /// Response headers describing this status
    pub fn header_pairs(&self) -> Vec<(&'static str, String)> {
        let mut headers = vec![(CACHE_HEADER, self.outcome.as_str().to_owned())];
        if let Some(similarity) = self.similarity {
            headers.push((SIMILARITY_HEADER, format!("{similarity:.4}")));
        }
        headers
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
    fn test_header_pairs() {
        assert_eq!(
            CacheStatus::hit(0.987_65).header_pairs(),
            vec![
                (CACHE_HEADER, "HIT".to_owned()),
                (SIMILARITY_HEADER, "0.9877".to_owned()),
            ]
        );
        assert_eq!(
            CacheStatus::miss().header_pairs(),
            vec![(CACHE_HEADER, "MISS".to_owned())]
        );
        assert_eq!(
            CacheStatus::bypass().header_pairs(),
            vec![(CACHE_HEADER, "BYPASS".to_owned())]
        );
    }

    #[test]
    fn test_serializes_outcome_uppercase() {
        let value = serde_json::to_value(CacheStatus::miss()).unwrap();
        assert_eq!(value["outcome"], "MISS");
        assert!(value["similarity"].is_null());
        assert!(!CacheStatus::miss().is_hit());
        assert!(CacheStatus::hit(1.0).is_hit());
    }
}
