//! Request-level cache flow: embed the prompt, look it up, record upstream responses.

use mimir_cache::{Cache, CacheEntry, CacheStats, CleanupTask, MemoryCache};
use mimir_core::{
    CacheConfig, ChatCompletionRequest, ChatCompletionResponse, MimirConfig, Result,
};
use mimir_embeddings::{Embedder, OllamaEmbedder};
use std::future::Future;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::prompt::prompt_text;
use crate::status::CacheStatus;

/// Result of looking a request up in the cache.
#[derive(Debug, Clone)]
pub enum Lookup {
    /// A stored response matched
    Hit {
        /// Stored response to replay
        response: ChatCompletionResponse,
        /// Similarity between the request and the matched entry
        similarity: f64,
    },
    /// Nothing matched; the embedding is kept so the upstream response can be recorded
    Miss {
        /// Embedding of the request prompt
        embedding: Vec<f64>,
    },
    /// The request is not eligible for caching
    Bypass,
}

impl Lookup {
    /// Cache status describing this lookup
    pub const fn status(&self) -> CacheStatus {
        match self {
            Self::Hit { similarity, .. } => CacheStatus::hit(*similarity),
            Self::Miss { .. } => CacheStatus::miss(),
            Self::Bypass => CacheStatus::bypass(),
        }
    }
}

/// Semantic cache in front of an upstream chat-completion backend
pub struct SemanticGateway<E: Embedder> {
    cache: Arc<dyn Cache>,
    embedder: E,
    config: CacheConfig,
}

impl<E: Embedder> SemanticGateway<E> {
    /// Creates a gateway over an existing cache and embedder
    pub fn new(cache: Arc<dyn Cache>, embedder: E, config: CacheConfig) -> Self {
        Self {
            cache,
            embedder,
            config,
        }
    }

    /// Shared handle to the underlying cache
    pub const fn cache(&self) -> &Arc<dyn Cache> {
        &self.cache
    }

    /// The embedder used to key requests
    pub const fn embedder(&self) -> &E {
        &self.embedder
    }

    /// Cache settings in effect
    pub const fn config(&self) -> &CacheConfig {
        &self.config
    }

    /// Look `request` up in the cache
    ///
    /// Streamed requests bypass the cache without being embedded.
    ///
    /// # Errors
    /// Returns an error if the prompt cannot be embedded
    pub async fn lookup(&self, request: &ChatCompletionRequest) -> Result<Lookup> {
        if request.stream {
            debug!(model = %request.model, "streaming request bypasses cache");
            return Ok(Lookup::Bypass);
        }

        let prompt = prompt_text(request);
        let embedding = self
            .embedder
            .embed(&prompt)
            .await
            .inspect_err(|error| {
                warn!(
                    model = self.embedder.model_name(),
                    %error,
                    "failed to embed request prompt"
                );
            })?;

        match self
            .cache
            .get(&embedding, self.config.similarity_threshold)
            .await
        {
            Some(hit) => {
                debug!(similarity = hit.similarity, "cache hit");
                Ok(Lookup::Hit {
                    response: hit.entry.response,
                    similarity: hit.similarity,
                })
            }
            None => {
                debug!("cache miss");
                Ok(Lookup::Miss { embedding })
            }
        }
    }

    /// Store an upstream response under the embedding from a missed lookup
    ///
    /// # Errors
    /// Returns an error if the cache rejects the entry
    pub async fn record(
        &self,
        request: ChatCompletionRequest,
        response: ChatCompletionResponse,
        embedding: Vec<f64>,
    ) -> Result<()> {
        let entry = CacheEntry::new(request, response, embedding, self.config.ttl());
        self.cache.set(entry).await
    }

    /// Serve `request` from the cache, or from `upstream` on a miss
    ///
    /// Misses are recorded after `upstream` succeeds. If the prompt cannot be
    /// embedded the request goes upstream uncached with a bypass status, and a
    /// failure to store the response is logged without failing the request.
    ///
    /// # Errors
    /// Returns the upstream error when the request had to be forwarded and failed
    pub async fn respond<F, Fut>(
        &self,
        request: ChatCompletionRequest,
        upstream: F,
    ) -> Result<(ChatCompletionResponse, CacheStatus)>
    where
        F: FnOnce(&ChatCompletionRequest) -> Fut,
        Fut: Future<Output = Result<ChatCompletionResponse>>,
    {
        let lookup = match self.lookup(&request).await {
            Ok(lookup) => lookup,
            Err(_embedding_failed) => Lookup::Bypass,
        };
        let status = lookup.status();

        match lookup {
            Lookup::Hit { response, .. } => Ok((response, status)),
            Lookup::Bypass => Ok((upstream(&request).await?, status)),
            Lookup::Miss { embedding } => {
                let response = upstream(&request).await?;
                if let Err(error) = self.record(request, response.clone(), embedding).await {
                    warn!(%error, "failed to cache upstream response");
                }
                Ok((response, status))
            }
        }
    }

    /// Current cache statistics
    pub async fn stats(&self) -> CacheStats {
        self.cache.stats().await
    }

    /// Start the periodic expiry sweep at the configured interval
    ///
    /// Must be called from within a tokio runtime.
    pub fn start_cleanup(&self) -> CleanupTask {
        CleanupTask::start(Arc::clone(&self.cache), self.config.cleanup_interval())
    }
}

impl SemanticGateway<OllamaEmbedder> {
    /// Build an in-memory gateway backed by Ollama from `config`
    ///
    /// # Errors
    /// Returns an error if the configuration is invalid
    pub fn from_config(config: &MimirConfig) -> Result<Self> {
        config.validate()?;
        let cache: Arc<dyn Cache> = Arc::new(MemoryCache::new(&config.cache));
        info!(
            max_entries = config.cache.max_entries,
            threshold = config.cache.similarity_threshold,
            model = %config.embedding.model,
            "semantic cache gateway configured"
        );
        Ok(Self::new(
            cache,
            OllamaEmbedder::new(&config.embedding),
            config.cache.clone(),
        ))
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
    use mimir_core::Message;
    use mimir_embeddings::HashEmbedder;

    #[test]
    fn test_from_config_rejects_invalid_threshold() {
        let mut config = MimirConfig::default();
        config.cache.similarity_threshold = 1.5;
        assert!(SemanticGateway::from_config(&config).is_err());
    }

    #[test]
    fn test_from_config_uses_embedding_model() {
        let config = MimirConfig::default();
        let gateway = SemanticGateway::from_config(&config).unwrap();
        assert_eq!(gateway.embedder().model_name(), "nomic-embed-text");
        assert_eq!(gateway.embedder().dimensions(), 768);
        assert_eq!(gateway.config(), &config.cache);
    }

    #[tokio::test]
    async fn test_stream_bypasses_without_embedding() {
        let config = CacheConfig::default();
        let cache: Arc<dyn Cache> = Arc::new(MemoryCache::new(&config));
        let gateway = SemanticGateway::new(cache, HashEmbedder::new(64), config);
        let request =
            ChatCompletionRequest::new("gpt-4o", vec![Message::user("hello")]).with_stream(true);

        let lookup = gateway.lookup(&request).await.unwrap();

        assert!(matches!(lookup, Lookup::Bypass));
        assert_eq!(lookup.status(), CacheStatus::bypass());
        assert_eq!(gateway.stats().await.total_misses, 0);
    }
}
