//! Embedding backends that turn request text into vectors for the cache.

/// Deterministic hashing embedder.
pub mod hash;
/// Ollama-backed embedder.
pub mod ollama;

pub use hash::HashEmbedder;
pub use ollama::{OllamaEmbedder, dimensions_for_model};

use mimir_core::Result;
use std::future::Future;

/// Trait for generating embeddings from text
pub trait Embedder: Send + Sync {
    /// Generate the embedding for one text
    ///
    /// # Errors
    /// Returns an error if the backend fails or returns no vector
    fn embed(&self, text: &str) -> impl Future<Output = Result<Vec<f64>>> + Send;

    /// Generate embeddings for several texts, in order
    ///
    /// The default embeds one text at a time; backends with native batching
    /// override it.
    ///
    /// # Errors
    /// Returns an error if any embedding fails
    fn embed_batch(&self, texts: &[String]) -> impl Future<Output = Result<Vec<Vec<f64>>>> + Send {
        async move {
            let mut embeddings = Vec::with_capacity(texts.len());
            for text in texts {
                embeddings.push(self.embed(text).await?);
            }
            Ok(embeddings)
        }
    }

    /// Length of the vectors this embedder produces
    fn dimensions(&self) -> usize;

    /// Name of the embedding model
    fn model_name(&self) -> &str;
}
