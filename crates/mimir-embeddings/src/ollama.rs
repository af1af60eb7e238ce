//! Embedding generation through a local Ollama server.

use mimir_core::{EmbeddingConfig, Error, Result};
use ollama_rs::Ollama;
use ollama_rs::generation::embeddings::request::{EmbeddingsInput, GenerateEmbeddingsRequest};
use std::future::Future;
use std::time::Duration;
use tokio::time::timeout;
use tracing::debug;

use crate::Embedder;

/// Default dimensionality for models not in the known list.
const DEFAULT_DIMENSIONS: usize = 768;

/// Embedding dimensionality of a known Ollama model, ignoring any `:tag` suffix
pub fn dimensions_for_model(model: &str) -> usize {
    let base = model.split(':').next().unwrap_or(model);
    match base {
        "mxbai-embed-large" => 1024,
        "all-minilm" => 384,
        _ => DEFAULT_DIMENSIONS,
    }
}

/// Ollama embedding client
pub struct OllamaEmbedder {
    ollama: Ollama,
    model: String,
    dimensions: usize,
    timeout: Duration,
}

impl OllamaEmbedder {
    /// Creates a client for the server and model named in `config`
    pub fn new(config: &EmbeddingConfig) -> Self {
        Self {
            ollama: Ollama::new(config.host.clone(), config.port),
            model: config.model.clone(),
            dimensions: dimensions_for_model(&config.model),
            timeout: config.timeout(),
        }
    }

    /// Check that the server is reachable and has the embedding model
    ///
    /// # Errors
    /// Returns an error if Ollama cannot be reached or the model is not pulled
    pub async fn ensure_model_available(&self) -> Result<()> {
        let models = self
            .with_timeout(self.ollama.list_local_models())
            .await?
            .map_err(|error| {
                Error::Embedding(format!(
                    "Failed to connect to Ollama: {error}. Is `ollama serve` running?"
                ))
            })?;

        if models.iter().any(|model| model.name.contains(&self.model)) {
            debug!(model = %self.model, "Embedding model available");
            Ok(())
        } else {
            Err(Error::Embedding(format!(
                "Embedding model '{}' not found. Run: ollama pull {}",
                self.model, self.model
            )))
        }
    }

    async fn with_timeout<F: Future>(&self, future: F) -> Result<F::Output> {
        timeout(self.timeout, future)
            .await
            .map_err(|_elapsed| Error::Timeout(self.timeout.as_secs()))
    }

    async fn generate(&self, input: EmbeddingsInput) -> Result<Vec<Vec<f64>>> {
        debug!(model = %self.model, "Requesting embeddings from Ollama");
        let request = GenerateEmbeddingsRequest::new(self.model.clone(), input);

        let response = self
            .with_timeout(self.ollama.generate_embeddings(request))
            .await?
            .map_err(|error| {
                let error_str = format!("{error:?}");
                if error_str.contains("model") && error_str.contains("not found") {
                    Error::Embedding(format!(
                        "Embedding model '{}' not found. Run: ollama pull {}",
                        self.model, self.model
                    ))
                } else {
                    Error::Embedding(format!("Embedding generation failed: {error}"))
                }
            })?;

        Ok(response
            .embeddings
            .into_iter()
            .map(|embedding| embedding.into_iter().map(f64::from).collect())
            .collect())
    }
}

impl Default for OllamaEmbedder {
    fn default() -> Self {
        Self::new(&EmbeddingConfig::default())
    }
}

impl Embedder for OllamaEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f64>> {
        let embedding = self
            .generate(text.to_owned().into())
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| Error::Embedding("No embeddings returned".to_owned()))?;

        if embedding.is_empty() {
            return Err(Error::Embedding("Empty embedding returned".to_owned()));
        }
        Ok(embedding)
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f64>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        if let [single] = texts {
            return Ok(vec![self.embed(single).await?]);
        }

        let embeddings = self.generate(texts.to_vec().into()).await?;
        if embeddings.len() != texts.len() {
            return Err(Error::Embedding(format!(
                "Expected {} embeddings, got {}",
                texts.len(),
                embeddings.len()
            )));
        }
        if embeddings.iter().any(Vec::is_empty) {
            return Err(Error::Embedding("Empty embedding returned".to_owned()));
        }
        Ok(embeddings)
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn model_name(&self) -> &str {
        &self.model
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
    fn test_known_dimensions() {
        assert_eq!(dimensions_for_model("nomic-embed-text"), 768);
        assert_eq!(dimensions_for_model("mxbai-embed-large"), 1024);
        assert_eq!(dimensions_for_model("all-minilm:latest"), 384);
        assert_eq!(dimensions_for_model("some-new-model"), 768);
    }

    #[test]
    fn test_embedder_reports_config() {
        let config = EmbeddingConfig {
            model: "mxbai-embed-large".to_owned(),
            ..EmbeddingConfig::default()
        };
        let embedder = OllamaEmbedder::new(&config);
        assert_eq!(embedder.model_name(), "mxbai-embed-large");
        assert_eq!(embedder.dimensions(), 1024);
    }

    #[tokio::test]
    async fn test_unreachable_server_is_an_error() {
        let config = EmbeddingConfig {
            host: "http://127.0.0.1".to_owned(),
            port: 9,
            timeout_seconds: 5,
            ..EmbeddingConfig::default()
        };
        let embedder = OllamaEmbedder::new(&config);

        let error = embedder.embed("hello").await.unwrap_err();
        assert!(
            matches!(error, Error::Embedding(_) | Error::Timeout(_)),
            "unexpected error: {error}"
        );
        assert!(error.is_retryable());
        assert!(embedder.embed_batch(&[]).await.unwrap().is_empty());
    }
}
