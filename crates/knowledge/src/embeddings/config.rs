//! Embedding configuration.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use verirag_core::AppConfig;

/// Settings needed to build an embedding provider.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EmbeddingConfig {
    /// Provider name: "mock", "ollama", "openai"
    pub provider: String,

    /// Model identifier (provider-specific)
    pub model: String,

    /// Embedding vector dimensions
    pub dimensions: usize,

    /// Custom endpoint, if any
    #[serde(default)]
    pub endpoint: Option<String>,

    /// Maximum number of texts per request
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// HTTP request timeout in seconds
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

fn default_batch_size() -> usize {
    100
}

fn default_request_timeout_secs() -> u64 {
    60
}

/// Known dimensions for common embedding models.
const KNOWN_DIMENSIONS: &[(&str, usize)] = &[
    ("nomic-embed-text", 768),
    ("mxbai-embed-large", 1024),
    ("all-minilm", 384),
    ("text-embedding-3-small", 1536),
    ("text-embedding-3-large", 3072),
    ("text-embedding-ada-002", 1536),
    ("trigram-v1", 384),
];

/// Look up the vector size of a well-known model.
pub fn known_dimensions(model: &str) -> Option<usize> {
    KNOWN_DIMENSIONS
        .iter()
        .find(|(name, _)| *name == model)
        .map(|(_, dims)| *dims)
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: "mock".to_string(),
            model: "trigram-v1".to_string(),
            dimensions: 384,
            endpoint: None,
            batch_size: default_batch_size(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

impl EmbeddingConfig {
    /// Derive the embedding settings from the application configuration.
    pub fn from_app_config(config: &AppConfig) -> Self {
        let model = config.embedding_model.clone();
        let dimensions = config
            .embedding_dimensions
            .or_else(|| known_dimensions(&model))
            .unwrap_or(768);

        Self {
            provider: config.embedding_provider.clone(),
            model,
            dimensions,
            endpoint: config.endpoint_for(&config.embedding_provider),
            batch_size: default_batch_size(),
            request_timeout_secs: config.rag.backend_timeout_secs,
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = EmbeddingConfig::default();
        assert_eq!(config.provider, "mock");
        assert_eq!(config.dimensions, 384);
        assert_eq!(config.batch_size, 100);
    }

    #[test]
    fn test_from_app_config_uses_known_dimensions() {
        let mut app = AppConfig::default();
        app.embedding_provider = "openai".to_string();
        app.embedding_model = "text-embedding-3-small".to_string();

        let config = EmbeddingConfig::from_app_config(&app);
        assert_eq!(config.dimensions, 1536);
        assert_eq!(config.request_timeout(), app.backend_timeout());
    }

    #[test]
    fn test_explicit_dimensions_win() {
        let mut app = AppConfig::default();
        app.embedding_dimensions = Some(256);

        let config = EmbeddingConfig::from_app_config(&app);
        assert_eq!(config.dimensions, 256);
    }
}
