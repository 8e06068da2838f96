//! Configuration management for verirag.
//!
//! Configuration is merged from several sources, later ones winning:
//! - Built-in defaults
//! - Config file (`.verirag/config.yaml` or `VERIRAG_CONFIG`)
//! - Environment variables
//! - Command-line flags
//!
//! The configuration is workspace-centric, with the index, prompt overrides
//! and chat transcripts stored under `.verirag/`.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::error::{AppError, AppResult};

/// Providers that can serve completions.
pub const COMPLETION_PROVIDERS: [&str; 3] = ["ollama", "openai", "scripted"];

/// Providers that can serve embeddings.
pub const EMBEDDING_PROVIDERS: [&str; 3] = ["ollama", "openai", "mock"];

/// Main application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Path to the workspace root (contains .verirag/)
    pub workspace: PathBuf,

    /// Optional config file path
    pub config_file: Option<PathBuf>,

    /// Completion provider (e.g., "ollama", "openai")
    pub provider: String,

    /// Completion model identifier
    pub model: String,

    /// Embedding provider (e.g., "ollama", "openai", "mock")
    pub embedding_provider: String,

    /// Embedding model identifier
    pub embedding_model: String,

    /// Embedding dimensions, when the provider config pins them
    pub embedding_dimensions: Option<usize>,

    /// API key for the completion provider
    pub api_key: Option<String>,

    /// Log level override
    pub log_level: Option<String>,

    /// Verbose mode (enables debug logging)
    pub verbose: bool,

    /// Disable colored output
    pub no_color: bool,

    /// Emit logs as JSON
    pub log_json: bool,

    /// Provider configurations from config.yaml
    pub llm: Option<LlmConfig>,

    /// Retrieval and workflow settings
    pub rag: RagSettings,
}

/// LLM configuration from config.yaml.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    #[serde(rename = "activeProvider")]
    pub active_provider: String,

    #[serde(rename = "activeEmbeddingProvider")]
    pub active_embedding_provider: String,

    #[serde(default)]
    pub providers: HashMap<String, ProviderConfig>,
}

/// Provider-specific configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ProviderConfig {
    OpenAI {
        #[serde(rename = "apiKeyEnv")]
        api_key_env: String,
        model: String,
        #[serde(rename = "embeddingModel")]
        embedding_model: Option<String>,
        #[serde(rename = "embeddingDimensions")]
        embedding_dimensions: Option<usize>,
        endpoint: Option<String>,
    },
    Ollama {
        endpoint: String,
        model: String,
        #[serde(rename = "embeddingModel")]
        embedding_model: Option<String>,
        #[serde(rename = "embeddingDimensions")]
        embedding_dimensions: Option<usize>,
    },
}

impl ProviderConfig {
    /// Completion model configured for this provider.
    pub fn model(&self) -> &str {
        match self {
            Self::OpenAI { model, .. } | Self::Ollama { model, .. } => model,
        }
    }

    /// Embedding model configured for this provider, if any.
    pub fn embedding_model(&self) -> Option<&str> {
        match self {
            Self::OpenAI {
                embedding_model, ..
            }
            | Self::Ollama {
                embedding_model, ..
            } => embedding_model.as_deref(),
        }
    }

    /// Embedding dimensions pinned by this provider, if any.
    pub fn embedding_dimensions(&self) -> Option<usize> {
        match self {
            Self::OpenAI {
                embedding_dimensions,
                ..
            }
            | Self::Ollama {
                embedding_dimensions,
                ..
            } => *embedding_dimensions,
        }
    }

    /// Custom endpoint for this provider.
    pub fn endpoint(&self) -> Option<&str> {
        match self {
            Self::OpenAI { endpoint, .. } => endpoint.as_deref(),
            Self::Ollama { endpoint, .. } => Some(endpoint.as_str()),
        }
    }
}

/// Retrieval, context and retry settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RagSettings {
    /// Number of nearest passages requested from the index
    #[serde(default = "default_top_k")]
    pub top_k: usize,

    /// Retrieved passages shorter than this (in characters) are dropped
    #[serde(default = "default_min_chunk_chars")]
    pub min_chunk_chars: usize,

    /// Character budget of the context block given to the generator and validator
    #[serde(default = "default_max_context_chars")]
    pub max_context_chars: usize,

    /// Maximum number of regeneration attempts after a failed validation
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Deadline applied to every completion, embedding and index call
    #[serde(default = "default_backend_timeout_secs")]
    pub backend_timeout_secs: u64,

    /// Vector index collection name
    #[serde(default = "default_collection")]
    pub collection: String,

    /// Target chunk size (characters) used by ingestion
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,

    /// Overlap between consecutive chunks (characters) used by ingestion
    #[serde(default = "default_chunk_overlap")]
    pub chunk_overlap: usize,
}

fn default_top_k() -> usize {
    5
}

fn default_min_chunk_chars() -> usize {
    50
}

fn default_max_context_chars() -> usize {
    12_000
}

fn default_max_retries() -> u32 {
    2
}

fn default_backend_timeout_secs() -> u64 {
    60
}

fn default_collection() -> String {
    "rag_documents".to_string()
}

fn default_chunk_size() -> usize {
    1000
}

fn default_chunk_overlap() -> usize {
    200
}

impl Default for RagSettings {
    fn default() -> Self {
        Self {
            top_k: default_top_k(),
            min_chunk_chars: default_min_chunk_chars(),
            max_context_chars: default_max_context_chars(),
            max_retries: default_max_retries(),
            backend_timeout_secs: default_backend_timeout_secs(),
            collection: default_collection(),
            chunk_size: default_chunk_size(),
            chunk_overlap: default_chunk_overlap(),
        }
    }
}

/// Full configuration file structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct ConfigFile {
    llm: Option<LlmConfig>,
    rag: Option<RagSettings>,
    logging: Option<LoggingConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct LoggingConfig {
    level: Option<String>,
    color: Option<bool>,
    json: Option<bool>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            workspace: std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
            config_file: None,
            provider: "ollama".to_string(), // Local-first default
            model: "llama3.2".to_string(),
            embedding_provider: "ollama".to_string(),
            embedding_model: "nomic-embed-text".to_string(),
            embedding_dimensions: None,
            api_key: None,
            log_level: None,
            verbose: false,
            no_color: false,
            log_json: false,
            llm: None,
            rag: RagSettings::default(),
        }
    }
}

impl AppConfig {
    /// Load configuration from the default workspace, config file and environment.
    ///
    /// Environment variables:
    /// - `VERIRAG_WORKSPACE`: Override workspace path
    /// - `VERIRAG_CONFIG`: Path to config file
    /// - `VERIRAG_PROVIDER` / `VERIRAG_MODEL`: Completion provider and model
    /// - `VERIRAG_EMBEDDING_PROVIDER` / `VERIRAG_EMBEDDING_MODEL`: Embedding provider and model
    /// - `VERIRAG_API_KEY`: API key
    /// - `RUST_LOG`: Log level
    /// - `NO_COLOR`: Disable colored output
    ///
    /// # Example
    /// ```no_run
    /// use verirag_core::config::AppConfig;
    ///
    /// let config = AppConfig::load().expect("Failed to load config");
    /// println!("Workspace: {:?}", config.workspace);
    /// ```
    pub fn load() -> AppResult<Self> {
        Self::load_from(None, None)
    }

    /// Load configuration, with explicit workspace and config file taking
    /// precedence over their environment variables.
    pub fn load_from(workspace: Option<PathBuf>, config_file: Option<PathBuf>) -> AppResult<Self> {
        let mut config = Self::default();

        if let Some(workspace) = workspace.or_else(|| env_path("VERIRAG_WORKSPACE")) {
            config.workspace = workspace;
        }

        config.config_file = config_file.or_else(|| env_path("VERIRAG_CONFIG"));

        if !config.workspace.exists() {
            return Err(AppError::Config(format!(
                "Workspace directory does not exist: {:?}",
                config.workspace
            )));
        }

        let config_path = match config.config_file {
            Some(ref cf) => cf.clone(),
            None => config.verirag_dir().join("config.yaml"),
        };

        if config_path.exists() {
            config = config.merge_yaml(&config_path)?;
        } else if config.config_file.is_some() {
            return Err(AppError::Config(format!(
                "Config file does not exist: {:?}",
                config_path
            )));
        }

        // Environment variables override YAML config
        if let Ok(provider) = std::env::var("VERIRAG_PROVIDER") {
            config.provider = provider;
        }

        if let Ok(model) = std::env::var("VERIRAG_MODEL") {
            config.model = model;
        }

        if let Ok(provider) = std::env::var("VERIRAG_EMBEDDING_PROVIDER") {
            config.embedding_provider = provider;
        }

        if let Ok(model) = std::env::var("VERIRAG_EMBEDDING_MODEL") {
            config.embedding_model = model;
        }

        config.api_key = std::env::var("VERIRAG_API_KEY").ok();

        if let Ok(level) = std::env::var("RUST_LOG") {
            config.log_level = Some(level);
        }

        if std::env::var("NO_COLOR").is_ok() {
            config.no_color = true;
        }

        Ok(config)
    }

    /// Merge a YAML configuration file into a copy of this config.
    fn merge_yaml(&self, path: &Path) -> AppResult<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            AppError::Config(format!("Failed to read config file {:?}: {}", path, e))
        })?;

        let config_file: ConfigFile = serde_yaml::from_str(&contents).map_err(|e| {
            AppError::Config(format!("Failed to parse config file {:?}: {}", path, e))
        })?;

        let mut result = self.clone();

        if let Some(logging) = config_file.logging {
            if let Some(level) = logging.level {
                result.log_level = Some(level);
            }
            if let Some(color) = logging.color {
                result.no_color = !color;
            }
            if let Some(json) = logging.json {
                result.log_json = json;
            }
        }

        if let Some(rag) = config_file.rag {
            result.rag = rag;
        }

        if let Some(llm) = config_file.llm {
            result.provider = llm.active_provider.clone();
            if let Some(provider_config) = llm.providers.get(&llm.active_provider) {
                result.model = provider_config.model().to_string();
            }

            result.embedding_provider = llm.active_embedding_provider.clone();
            if let Some(provider_config) = llm.providers.get(&llm.active_embedding_provider) {
                if let Some(model) = provider_config.embedding_model() {
                    result.embedding_model = model.to_string();
                }
                result.embedding_dimensions = provider_config.embedding_dimensions();
            }

            result.llm = Some(llm);
        }

        tracing::debug!("Merged config file {:?}", path);
        Ok(result)
    }

    /// Apply CLI overrides to the configuration.
    ///
    /// Flags take precedence over environment variables and the config file.
    #[allow(clippy::too_many_arguments)]
    pub fn with_overrides(
        mut self,
        provider: Option<String>,
        model: Option<String>,
        log_level: Option<String>,
        verbose: bool,
        no_color: bool,
        log_json: bool,
        max_retries: Option<u32>,
    ) -> Self {
        if let Some(provider) = provider {
            self.provider = provider;
        }

        if let Some(model) = model {
            self.model = model;
        }

        if let Some(log_level) = log_level {
            self.log_level = Some(log_level);
        }

        if verbose {
            self.verbose = true;
            // Verbose mode implies debug logging
            if self.log_level.is_none() {
                self.log_level = Some("debug".to_string());
            }
        }

        if no_color {
            self.no_color = true;
        }

        if log_json {
            self.log_json = true;
        }

        if let Some(max_retries) = max_retries {
            self.rag.max_retries = max_retries;
        }

        self
    }

    /// Get the path to the .verirag directory.
    pub fn verirag_dir(&self) -> PathBuf {
        self.workspace.join(".verirag")
    }

    /// Ensure the .verirag directory exists.
    pub fn ensure_verirag_dir(&self) -> AppResult<()> {
        let dir = self.verirag_dir();
        if !dir.exists() {
            std::fs::create_dir_all(&dir).map_err(|e| {
                AppError::Config(format!("Failed to create .verirag directory: {}", e))
            })?;
        }
        Ok(())
    }

    /// Path of the SQLite vector index.
    pub fn index_path(&self) -> PathBuf {
        self.verirag_dir().join("index.sqlite")
    }

    /// Directory holding saved chat transcripts.
    pub fn transcripts_dir(&self) -> PathBuf {
        self.verirag_dir().join("transcripts")
    }

    /// Backend call deadline.
    pub fn backend_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.rag.backend_timeout_secs)
    }

    /// Get the configuration block for a provider.
    pub fn get_provider_config(&self, provider: &str) -> Option<&ProviderConfig> {
        self.llm.as_ref().and_then(|llm| llm.providers.get(provider))
    }

    /// Endpoint configured for a provider, if any.
    pub fn endpoint_for(&self, provider: &str) -> Option<String> {
        self.get_provider_config(provider)
            .and_then(|pc| pc.endpoint())
            .map(str::to_string)
    }

    /// Resolve the API key for a provider.
    ///
    /// `VERIRAG_API_KEY` wins, then the provider's `apiKeyEnv`, then
    /// `OPENAI_API_KEY` for the OpenAI provider.
    pub fn resolve_api_key(&self, provider: &str) -> Option<String> {
        if let Some(ref key) = self.api_key {
            return Some(key.clone());
        }

        if let Some(ProviderConfig::OpenAI { api_key_env, .. }) = self.get_provider_config(provider)
        {
            if let Ok(key) = std::env::var(api_key_env) {
                return Some(key);
            }
        }

        if provider == "openai" {
            return std::env::var("OPENAI_API_KEY").ok();
        }

        None
    }

    /// Validate configuration for the active providers.
    pub fn validate(&self) -> AppResult<()> {
        if !COMPLETION_PROVIDERS.contains(&self.provider.as_str()) {
            return Err(AppError::Config(format!(
                "Unknown provider: {}. Supported: {}",
                self.provider,
                COMPLETION_PROVIDERS.join(", ")
            )));
        }

        if !EMBEDDING_PROVIDERS.contains(&self.embedding_provider.as_str()) {
            return Err(AppError::Config(format!(
                "Unknown embedding provider: {}. Supported: {}",
                self.embedding_provider,
                EMBEDDING_PROVIDERS.join(", ")
            )));
        }

        for provider in [&self.provider, &self.embedding_provider] {
            if provider == "openai" && self.resolve_api_key(provider).is_none() {
                return Err(AppError::Config(
                    "OpenAI provider requires an API key (VERIRAG_API_KEY or OPENAI_API_KEY)"
                        .to_string(),
                ));
            }
        }

        if self.rag.top_k == 0 {
            return Err(AppError::Config("rag.topK must be at least 1".to_string()));
        }

        if self.rag.backend_timeout_secs == 0 {
            return Err(AppError::Config(
                "rag.backendTimeoutSecs must be at least 1".to_string(),
            ));
        }

        if self.rag.chunk_overlap >= self.rag.chunk_size {
            return Err(AppError::Config(format!(
                "rag.chunkOverlap ({}) must be smaller than rag.chunkSize ({})",
                self.rag.chunk_overlap, self.rag.chunk_size
            )));
        }

        Ok(())
    }
}

fn env_path(key: &str) -> Option<PathBuf> {
    std::env::var(key).ok().map(PathBuf::from)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write_config(dir: &Path, contents: &str) -> PathBuf {
        let path = dir.join("config.yaml");
        std::fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.provider, "ollama");
        assert_eq!(config.model, "llama3.2");
        assert_eq!(config.embedding_model, "nomic-embed-text");
        assert!(!config.verbose);
        assert!(!config.no_color);
    }

    #[test]
    fn test_rag_defaults() {
        let rag = RagSettings::default();
        assert_eq!(rag.top_k, 5);
        assert_eq!(rag.min_chunk_chars, 50);
        assert_eq!(rag.max_context_chars, 12_000);
        assert_eq!(rag.max_retries, 2);
        assert_eq!(rag.collection, "rag_documents");
    }

    #[test]
    fn test_verirag_paths() {
        let config = AppConfig::default();
        assert!(config.verirag_dir().ends_with(".verirag"));
        assert!(config.index_path().ends_with("index.sqlite"));
    }

    #[test]
    fn test_with_overrides() {
        let config = AppConfig::default();
        let overridden = config.with_overrides(
            Some("openai".to_string()),
            Some("gpt-4o-mini".to_string()),
            None,
            true,
            false,
            false,
            Some(4),
        );

        assert_eq!(overridden.provider, "openai");
        assert_eq!(overridden.model, "gpt-4o-mini");
        assert!(overridden.verbose);
        assert_eq!(overridden.log_level, Some("debug".to_string()));
        assert_eq!(overridden.rag.max_retries, 4);
    }

    #[test]
    fn test_merge_yaml() {
        let temp = TempDir::new().unwrap();
        let path = write_config(
            temp.path(),
            r#"
llm:
  activeProvider: ollama
  activeEmbeddingProvider: ollama
  providers:
    ollama:
      endpoint: "http://localhost:11434"
      model: mistral
      embeddingModel: all-minilm
      embeddingDimensions: 384
rag:
  topK: 8
  maxRetries: 1
logging:
  level: warn
  color: false
"#,
        );

        let merged = AppConfig::default().merge_yaml(&path).unwrap();
        assert_eq!(merged.model, "mistral");
        assert_eq!(merged.embedding_model, "all-minilm");
        assert_eq!(merged.embedding_dimensions, Some(384));
        assert_eq!(merged.rag.top_k, 8);
        assert_eq!(merged.rag.max_retries, 1);
        // Unspecified settings keep their defaults
        assert_eq!(merged.rag.min_chunk_chars, 50);
        assert_eq!(merged.log_level, Some("warn".to_string()));
        assert!(merged.no_color);
        assert_eq!(
            merged.endpoint_for("ollama"),
            Some("http://localhost:11434".to_string())
        );
    }

    #[test]
    fn test_merge_invalid_yaml() {
        let temp = TempDir::new().unwrap();
        let path = write_config(temp.path(), "rag: [not, a, map");
        assert!(AppConfig::default().merge_yaml(&path).is_err());
    }

    #[test]
    fn test_load_from_missing_workspace() {
        let result = AppConfig::load_from(Some(PathBuf::from("/definitely/not/here")), None);
        assert!(matches!(result, Err(AppError::Config(_))));
    }

    #[test]
    fn test_validate_unknown_provider() {
        let mut config = AppConfig::default();
        config.provider = "unknown".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_ollama() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_mock_embeddings() {
        let mut config = AppConfig::default();
        config.embedding_provider = "mock".to_string();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_overlap_larger_than_chunk() {
        let mut config = AppConfig::default();
        config.rag.chunk_overlap = config.rag.chunk_size;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_zero_top_k() {
        let mut config = AppConfig::default();
        config.rag.top_k = 0;
        assert!(config.validate().is_err());
    }
}
