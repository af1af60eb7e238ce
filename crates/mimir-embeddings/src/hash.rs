use mimir_cache::normalize;
use mimir_core::Result;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash as _, Hasher as _};

use crate::Embedder;

/// Deterministic bag-of-words embedder.
///
/// Each lowercase word is hashed into one of `dimensions` buckets with a
/// hash-derived sign and the result is normalized. Identical texts map to
/// identical vectors and texts sharing words score higher than unrelated
/// ones. Useful for tests and for running without an embedding server.
#[derive(Debug, Clone)]
pub struct HashEmbedder {
    dimensions: usize,
}

impl HashEmbedder {
    /// Creates an embedder producing vectors of length `dimensions` (at least 1)
    pub fn new(dimensions: usize) -> Self {
        Self {
            dimensions: dimensions.max(1),
        }
    }

    /// Embed synchronously
    pub fn embed_text(&self, text: &str) -> Vec<f64> {
        let mut vector = vec![0.0; self.dimensions];
        for word in text
            .split(|character: char| !character.is_alphanumeric())
            .filter(|word| !word.is_empty())
        {
            let mut hasher = DefaultHasher::new();
            word.to_lowercase().hash(&mut hasher);
            let hash = hasher.finish();

            let bucket = (hash % self.dimensions as u64) as usize;
            let sign = if hash >> 63 == 0 { 1.0 } else { -1.0 };
            vector[bucket] += sign;
        }
        normalize(&vector)
    }
}

impl Default for HashEmbedder {
    fn default() -> Self {
        Self::new(384)
    }
}

impl Embedder for HashEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f64>> {
        Ok(self.embed_text(text))
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f64>>> {
        Ok(texts.iter().map(|text| self.embed_text(text)).collect())
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn model_name(&self) -> &str {
        "hash-bow"
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
    use mimir_cache::cosine_similarity;

    #[test]
    fn test_deterministic_and_case_insensitive() {
        let embedder = HashEmbedder::new(64);
        let first = embedder.embed_text("What is the capital of France?");
        let second = embedder.embed_text("what is the CAPITAL of france");
        assert_eq!(first.len(), 64);
        assert_eq!(first, second);
    }

    #[test]
    fn test_overlap_scores_higher() {
        let embedder = HashEmbedder::new(256);
        let base = embedder.embed_text("how do I reverse a linked list in rust");
        let similar = embedder.embed_text("how do I reverse a linked list in python");
        let unrelated = embedder.embed_text("best pizza toppings for a party");
        assert!(cosine_similarity(&base, &similar) > cosine_similarity(&base, &unrelated));
    }

    #[test]
    fn test_empty_text_is_zero_vector() {
        let embedder = HashEmbedder::new(8);
        let vector = embedder.embed_text("  ?! ");
        assert!(vector.iter().all(|value| value.abs() < f64::EPSILON));
    }

    #[tokio::test]
    async fn test_batch_matches_single() {
        let embedder = HashEmbedder::default();
        let texts = vec!["alpha beta".to_owned(), "gamma".to_owned()];
        let batch = embedder.embed_batch(&texts).await.unwrap();
        assert_eq!(batch.len(), 2);
        assert_eq!(batch[1], embedder.embed("gamma").await.unwrap());
        assert_eq!(embedder.dimensions(), 384);
    }
}
