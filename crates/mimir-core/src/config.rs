//! Configuration types for the cache engine and the embedding backend.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;

/// Complete Mimir configuration.
#[derive(Default, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MimirConfig {
    /// Cache engine configuration
    pub cache: CacheConfig,
    /// Embedding backend configuration
    pub embedding: EmbeddingConfig,
}

/// Cache configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Maximum number of entries held before eviction kicks in
    pub max_entries: usize,
    /// Time-to-live for new entries in seconds
    pub ttl_seconds: u64,
    /// Interval between background cleanup sweeps in seconds
    pub cleanup_interval_seconds: u64,
    /// Minimum cosine similarity for a cached entry to count as a match
    pub similarity_threshold: f64,
    /// Estimated upstream cost in USD avoided by each hit
    pub cost_per_hit: f64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_entries: 10_000,
            ttl_seconds: 24 * 3600,
            cleanup_interval_seconds: 300,
            similarity_threshold: 0.95,
            // Roughly 500 tokens at $0.002 per 1K tokens
            cost_per_hit: 0.001,
        }
    }
}

impl CacheConfig {
    /// Time-to-live applied to new entries
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_seconds)
    }

    /// Interval between cleanup sweeps
    pub fn cleanup_interval(&self) -> Duration {
        Duration::from_secs(self.cleanup_interval_seconds)
    }

    /// Check the values are usable by the cache engine
    ///
    /// # Errors
    /// Returns a configuration error if the capacity, TTL or cleanup interval is
    /// zero, or the threshold lies outside `(0, 1]`.
    pub fn validate(&self) -> Result<()> {
        if self.max_entries == 0 {
            return Err(Error::Config("cache.max_entries must be positive".to_owned()));
        }
        if self.ttl_seconds == 0 {
            return Err(Error::Config("cache.ttl_seconds must be positive".to_owned()));
        }
        if self.cleanup_interval_seconds == 0 {
            return Err(Error::Config(
                "cache.cleanup_interval_seconds must be positive".to_owned(),
            ));
        }
        if !(self.similarity_threshold > 0.0 && self.similarity_threshold <= 1.0) {
            return Err(Error::Config(format!(
                "cache.similarity_threshold must be in (0, 1], got {}",
                self.similarity_threshold
            )));
        }
        if !self.cost_per_hit.is_finite() || self.cost_per_hit < 0.0 {
            return Err(Error::Config(format!(
                "cache.cost_per_hit must be a non-negative number, got {}",
                self.cost_per_hit
            )));
        }
        Ok(())
    }
}

/// Embedding backend configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingConfig {
    /// Ollama host URL without port
    pub host: String,
    /// Ollama port
    pub port: u16,
    /// Embedding model name
    pub model: String,
    /// Timeout in seconds for a single embedding request
    pub timeout_seconds: u64,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            host: "http://localhost".to_owned(),
            port: 11434,
            model: "nomic-embed-text".to_owned(),
            timeout_seconds: 30,
        }
    }
}

impl EmbeddingConfig {
    /// Timeout for a single embedding request
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }
}

impl MimirConfig {
    /// Get the default config directory path (`~/.mimir`)
    ///
    /// # Errors
    /// Returns an error if the home directory cannot be determined
    pub fn config_dir() -> Result<PathBuf> {
        use dirs::home_dir;
        let home = home_dir()
            .ok_or_else(|| Error::Config("Could not determine home directory".to_owned()))?;
        Ok(home.join(".mimir"))
    }

    /// Get the default config file path (`~/.mimir/config.toml`)
    ///
    /// # Errors
    /// Returns an error if the home directory cannot be determined
    pub fn config_path() -> Result<PathBuf> {
        Ok(Self::config_dir()?.join("config.toml"))
    }

    /// Load config from the default location (`~/.mimir/config.toml`)
    /// If the config doesn't exist, creates it with default values
    ///
    /// # Errors
    /// Returns an error if the config cannot be read, parsed or created
    pub fn load_or_create() -> Result<Self> {
        let config_path = Self::config_path()?;

        if config_path.exists() {
            Self::load_from_file(&config_path)
        } else {
            let config = Self::default();
            config.save_to_file(&config_path)?;
            info!("Wrote default configuration to {}", config_path.display());
            Ok(config)
        }
    }

    /// Load config from a specific file and validate it
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or parsed, or holds invalid values
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        let config: Self = toml::from_str(&contents)?;
        config.validate()?;
        info!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Save config to a specific file
    ///
    /// # Errors
    /// Returns an error if the file cannot be written
    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self)?;

        let header = "# Mimir Configuration File\n\
                      # This file is automatically generated on first run\n\
                      # Edit this file to customize your settings\n\n";

        fs::write(path, format!("{header}{contents}"))?;
        Ok(())
    }

    /// Validate every section
    ///
    /// # Errors
    /// Returns a configuration error describing the first invalid value
    pub fn validate(&self) -> Result<()> {
        self.cache.validate()?;
        if self.embedding.model.is_empty() {
            return Err(Error::Config("embedding.model must not be empty".to_owned()));
        }
        if self.embedding.timeout_seconds == 0 {
            return Err(Error::Config(
                "embedding.timeout_seconds must be positive".to_owned(),
            ));
        }
        Ok(())
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
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = MimirConfig::default();
        assert_eq!(config.cache.max_entries, 10_000);
        assert_eq!(config.cache.ttl(), Duration::from_secs(86_400));
        assert_eq!(config.cache.cleanup_interval(), Duration::from_secs(300));
        assert!((config.cache.similarity_threshold - 0.95).abs() < f64::EPSILON);
        assert_eq!(config.embedding.model, "nomic-embed-text");
        config.validate().unwrap();
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let zero_capacity = CacheConfig {
            max_entries: 0,
            ..CacheConfig::default()
        };
        assert!(matches!(zero_capacity.validate(), Err(Error::Config(_))));

        let bad_threshold = CacheConfig {
            similarity_threshold: 1.5,
            ..CacheConfig::default()
        };
        assert!(matches!(bad_threshold.validate(), Err(Error::Config(_))));

        let zero_threshold = CacheConfig {
            similarity_threshold: 0.0,
            ..CacheConfig::default()
        };
        assert!(matches!(zero_threshold.validate(), Err(Error::Config(_))));

        let negative_cost = CacheConfig {
            cost_per_hit: -1.0,
            ..CacheConfig::default()
        };
        assert!(matches!(negative_cost.validate(), Err(Error::Config(_))));
    }

    #[test]
    fn test_save_and_load_round_trip() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("nested").join("config.toml");

        let mut config = MimirConfig::default();
        config.cache.max_entries = 64;
        config.embedding.model = "all-minilm".to_owned();
        config.save_to_file(&path).unwrap();

        let written = fs::read_to_string(&path).unwrap();
        assert!(written.starts_with("# Mimir Configuration File"));

        let loaded = MimirConfig::load_from_file(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.toml");
        fs::write(&path, "[cache]\nmax_entries = 2\n").unwrap();

        let loaded = MimirConfig::load_from_file(&path).unwrap();
        assert_eq!(loaded.cache.max_entries, 2);
        assert_eq!(loaded.cache.ttl_seconds, 86_400);
        assert_eq!(loaded.embedding, EmbeddingConfig::default());
    }

    #[test]
    fn test_load_rejects_invalid_file() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.toml");
        fs::write(&path, "[cache]\nsimilarity_threshold = 2.0\n").unwrap();

        assert!(matches!(
            MimirConfig::load_from_file(&path),
            Err(Error::Config(_))
        ));

        fs::write(&path, "not = [valid").unwrap();
        assert!(matches!(
            MimirConfig::load_from_file(&path),
            Err(Error::Toml(_))
        ));
    }
}
