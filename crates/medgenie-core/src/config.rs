//! MedGenie Configuration Management
//!
//! Handles configuration from environment variables (optionally seeded from a
//! `.env` file by the binaries) and TOML config files, with defaults matching
//! the hosted deployment. Credentials are only ever read from the environment
//! in practice and are checked by [`AppConfig::validate`] before startup.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Environment variable naming an optional TOML config file
pub const CONFIG_FILE_ENV: &str = "MEDGENIE_CONFIG";

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    /// Server configuration
    pub server: ServerConfig,

    /// Pinecone vector index
    pub pinecone: PineconeConfig,

    /// Query embedding model
    pub embedding: EmbeddingConfig,

    /// LLM provider configuration
    pub llm: LlmConfig,

    /// RAG pipeline configuration
    pub rag: RagConfig,

    /// Logging configuration
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup
    ///
    /// `from_env` is this function applied to the process environment.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        Self::default().apply_overrides(lookup)
    }

    /// Load from a TOML file
    pub fn from_file(path: impl Into<PathBuf>) -> Result<Self, ConfigError> {
        let path = path.into();
        let content = std::fs::read_to_string(&path).map_err(|e| ConfigError::FileReadError {
            path: path.clone(),
            source: e,
        })?;

        toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path,
            message: e.to_string(),
        })
    }

    /// Merge with environment variables (env takes precedence)
    pub fn with_env_override(self) -> Result<Self, ConfigError> {
        self.apply_overrides(|key| std::env::var(key).ok())
    }

    /// Load from `MEDGENIE_CONFIG` (if set) plus the environment, then validate
    pub fn load() -> Result<Self, ConfigError> {
        let config = match std::env::var(CONFIG_FILE_ENV) {
            Ok(path) => Self::from_file(path)?.with_env_override()?,
            Err(_) => Self::from_env()?,
        };
        config.validate()?;
        Ok(config)
    }

    /// Check that every credential required by the selected providers is present
    pub fn validate(&self) -> Result<(), ConfigError> {
        if is_blank(&self.pinecone.api_key) {
            return Err(ConfigError::MissingRequired(
                "Pinecone API key is missing (set PINECONE_API_KEY)".to_string(),
            ));
        }

        if self.llm.provider == LlmProvider::Gemini && is_blank(&self.llm.gemini_api_key) {
            return Err(ConfigError::MissingRequired(
                "Gemini API key is missing (set GEMINI_API_KEY)".to_string(),
            ));
        }

        // A zero capacity or TTL would make the retrieval cache keep nothing
        let positive = [
            ("rag.max_top_k", self.rag.max_top_k as u64),
            ("rag.cache_max_capacity", self.rag.cache_max_capacity),
            ("rag.cache_ttl_seconds", self.rag.cache_ttl_seconds),
        ];
        if let Some((key, _)) = positive.iter().find(|(_, value)| *value == 0) {
            return Err(ConfigError::InvalidValue {
                key: key.to_string(),
                value: "0".to_string(),
            });
        }

        Ok(())
    }

    fn apply_overrides<F>(mut self, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        // Server
        if let Some(host) = lookup("API_HOST") {
            self.server.host = host;
        }
        if let Some(port) = lookup("API_PORT") {
            self.server.port = parse_value("API_PORT", port)?;
        }
        if let Some(dir) = lookup("STATIC_DIR") {
            self.server.static_dir = PathBuf::from(dir);
        }

        // Pinecone
        if let Some(key) = lookup("PINECONE_API_KEY") {
            self.pinecone.api_key = Some(key);
        }
        if let Some(index) = lookup("PINECONE_INDEX") {
            self.pinecone.index_name = index;
        }
        if let Some(host) = lookup("PINECONE_HOST") {
            self.pinecone.host = Some(host);
        }
        if let Some(namespace) = lookup("PINECONE_NAMESPACE") {
            self.pinecone.namespace = Some(namespace);
        }

        // Embedding
        if let Some(provider) = lookup("EMBEDDING_PROVIDER") {
            self.embedding.provider = provider.parse()?;
        }
        if let Some(model) = lookup("EMBEDDING_MODEL") {
            self.embedding.model = model;
        }
        if let Some(token) = lookup("HF_API_TOKEN") {
            self.embedding.api_token = Some(token);
        }

        // LLM
        if let Some(provider) = lookup("LLM_PROVIDER") {
            self.llm.provider = provider.parse()?;
        }
        if let Some(key) = lookup("GEMINI_API_KEY") {
            self.llm.gemini_api_key = Some(key);
        }
        if let Some(model) = lookup("LLM_MODEL") {
            self.llm.model = model;
        }
        if let Some(url) = lookup("OLLAMA_URL") {
            self.llm.ollama_url = url.clone();
            self.embedding.ollama_url = url;
        }

        // Logging
        if let Some(level) = lookup("LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Some(json) = lookup("LOG_JSON") {
            self.logging.json_format = parse_value("LOG_JSON", json)?;
        }

        Ok(self)
    }
}

fn is_blank(value: &Option<String>) -> bool {
    value.as_deref().map_or(true, |v| v.trim().is_empty())
}

fn parse_value<T: std::str::FromStr>(key: &str, value: String) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::InvalidValue {
        key: key.to_string(),
        value,
    })
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Host to bind to
    pub host: String,

    /// Port to listen on
    pub port: u16,

    /// Directory holding the front-end (`index.html` and assets)
    pub static_dir: PathBuf,

    /// Run a throw-away retrieval at startup
    pub warm_up: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
            static_dir: PathBuf::from("frontend"),
            warm_up: true,
        }
    }
}

/// Pinecone index configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PineconeConfig {
    /// API key (required)
    pub api_key: Option<String>,

    /// Index name
    pub index_name: String,

    /// Data-plane host; resolved from the control plane when unset
    pub host: Option<String>,

    /// Control-plane base URL
    pub control_plane_url: String,

    /// Namespace to query (default namespace when unset)
    pub namespace: Option<String>,

    /// Metadata field holding the document text
    pub text_key: String,

    /// Request timeout in seconds
    pub timeout_secs: u64,
}

impl Default for PineconeConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            index_name: "medical-rag-chatbot".to_string(),
            host: None,
            control_plane_url: "https://api.pinecone.io".to_string(),
            namespace: None,
            text_key: "text".to_string(),
            timeout_secs: 30,
        }
    }
}

/// Embedding model configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingConfig {
    /// Embedding provider to use
    pub provider: EmbeddingProvider,

    /// Model name
    pub model: String,

    /// HuggingFace Inference API base URL
    pub huggingface_url: String,

    /// HuggingFace API token (optional for public models)
    pub api_token: Option<String>,

    /// Ollama server URL
    pub ollama_url: String,

    /// Request timeout in seconds
    pub timeout_secs: u64,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: EmbeddingProvider::HuggingFace,
            model: "sentence-transformers/all-mpnet-base-v2".to_string(),
            huggingface_url: "https://router.huggingface.co/hf-inference/models".to_string(),
            api_token: None,
            ollama_url: "http://localhost:11434".to_string(),
            timeout_secs: 30,
        }
    }
}

/// Supported embedding providers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddingProvider {
    HuggingFace,
    Ollama,
}

impl std::str::FromStr for EmbeddingProvider {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "huggingface" | "hf" => Ok(Self::HuggingFace),
            "ollama" => Ok(Self::Ollama),
            _ => Err(ConfigError::InvalidValue {
                key: "EMBEDDING_PROVIDER".to_string(),
                value: s.to_string(),
            }),
        }
    }
}

/// LLM provider configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// LLM provider to use
    pub provider: LlmProvider,

    /// Gemini API key
    pub gemini_api_key: Option<String>,

    /// Gemini API base URL
    pub gemini_base_url: String,

    /// Ollama server URL
    pub ollama_url: String,

    /// Model name to use
    pub model: String,

    /// Maximum tokens for completion
    pub max_tokens: u32,

    /// Temperature for generation
    pub temperature: f32,

    /// Request timeout in seconds
    pub timeout_secs: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: LlmProvider::Gemini,
            gemini_api_key: None,
            gemini_base_url: "https://generativelanguage.googleapis.com".to_string(),
            ollama_url: "http://localhost:11434".to_string(),
            model: "gemini-1.5-flash".to_string(),
            max_tokens: 1024,
            temperature: 0.0,
            timeout_secs: 60,
        }
    }
}

/// Supported LLM providers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LlmProvider {
    Gemini,
    Ollama,
}

impl std::str::FromStr for LlmProvider {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "gemini" => Ok(Self::Gemini),
            "ollama" => Ok(Self::Ollama),
            _ => Err(ConfigError::InvalidValue {
                key: "LLM_PROVIDER".to_string(),
                value: s.to_string(),
            }),
        }
    }
}

/// RAG pipeline configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RagConfig {
    /// Upper bound accepted for a request's `top_k`
    pub max_top_k: usize,

    /// Maximum number of cached retrieval results
    pub cache_max_capacity: u64,

    /// Time-to-live of a cached retrieval result (in seconds)
    pub cache_ttl_seconds: u64,
}

impl Default for RagConfig {
    fn default() -> Self {
        Self {
            max_top_k: 50,
            cache_max_capacity: 100,
            cache_ttl_seconds: 300,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,

    /// JSON format for logs
    pub json_format: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json_format: false,
        }
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    FileReadError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {message}")]
    ParseError { path: PathBuf, message: String },

    #[error("Invalid value for {key}: {value}")]
    InvalidValue { key: String, value: String },

    #[error("Missing required configuration: {0}")]
    MissingRequired(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.server.port, 8000);
        assert_eq!(config.pinecone.index_name, "medical-rag-chatbot");
        assert_eq!(config.llm.model, "gemini-1.5-flash");
        assert_eq!(config.rag.cache_max_capacity, 100);
        assert_eq!(config.rag.cache_ttl_seconds, 300);
    }

    #[test]
    fn test_from_lookup_with_credentials() {
        let config = AppConfig::from_lookup(lookup(&[
            ("PINECONE_API_KEY", "pc-key"),
            ("GEMINI_API_KEY", "gm-key"),
            ("API_PORT", "9000"),
            ("LOG_JSON", "true"),
        ]))
        .unwrap();

        assert_eq!(config.pinecone.api_key.as_deref(), Some("pc-key"));
        assert_eq!(config.llm.gemini_api_key.as_deref(), Some("gm-key"));
        assert_eq!(config.server.port, 9000);
        assert!(config.logging.json_format);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_missing_pinecone_key() {
        let config = AppConfig::from_lookup(lookup(&[("GEMINI_API_KEY", "gm-key")])).unwrap();
        let err = config.validate().unwrap_err();
        assert!(matches!(err, ConfigError::MissingRequired(_)));
        assert!(err.to_string().contains("PINECONE_API_KEY"));
    }

    #[test]
    fn test_missing_gemini_key() {
        let config = AppConfig::from_lookup(lookup(&[("PINECONE_API_KEY", "pc-key")])).unwrap();
        let err = config.validate().unwrap_err();
        assert!(matches!(err, ConfigError::MissingRequired(_)));
        assert!(err.to_string().contains("GEMINI_API_KEY"));
    }

    #[test]
    fn test_blank_key_counts_as_missing() {
        let config = AppConfig::from_lookup(lookup(&[
            ("PINECONE_API_KEY", "  "),
            ("GEMINI_API_KEY", "gm-key"),
        ]))
        .unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_ollama_does_not_need_gemini_key() {
        let config = AppConfig::from_lookup(lookup(&[
            ("PINECONE_API_KEY", "pc-key"),
            ("LLM_PROVIDER", "ollama"),
        ]))
        .unwrap();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_invalid_port() {
        let err = AppConfig::from_lookup(lookup(&[("API_PORT", "eighty")])).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { .. }));
    }

    #[test]
    fn test_zero_cache_settings_rejected() {
        let toml_bodies = [
            ("[rag]\ncache_max_capacity = 0", "rag.cache_max_capacity"),
            ("[rag]\ncache_ttl_seconds = 0", "rag.cache_ttl_seconds"),
            ("[rag]\nmax_top_k = 0", "rag.max_top_k"),
        ];

        for (body, expected_key) in toml_bodies {
            let mut config: AppConfig = toml::from_str(body).unwrap();
            config.pinecone.api_key = Some("pc-key".to_string());
            config.llm.gemini_api_key = Some("gm-key".to_string());

            match config.validate() {
                Err(ConfigError::InvalidValue { key, value }) => {
                    assert_eq!(key, expected_key);
                    assert_eq!(value, "0");
                }
                other => panic!("{body}: unexpected {other:?}"),
            }
        }
    }

    #[test]
    fn test_provider_parse() {
        assert_eq!("gemini".parse::<LlmProvider>().unwrap(), LlmProvider::Gemini);
        assert_eq!("Ollama".parse::<LlmProvider>().unwrap(), LlmProvider::Ollama);
        assert!("invalid".parse::<LlmProvider>().is_err());
        assert_eq!(
            "hf".parse::<EmbeddingProvider>().unwrap(),
            EmbeddingProvider::HuggingFace
        );
    }

    #[test]
    fn test_partial_toml() {
        let config: AppConfig = toml::from_str(
            r#"
            [server]
            port = 9100

            [rag]
            cache_ttl_seconds = 60
            "#,
        )
        .unwrap();

        assert_eq!(config.server.port, 9100);
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.rag.cache_ttl_seconds, 60);
        assert_eq!(config.rag.cache_max_capacity, 100);
    }
}
