//! MedGenie Core - Domain models, traits, and shared types
//!
//! This crate defines the core abstractions used throughout MedGenie:
//! - Query and result models exchanged by the pipeline and the API
//! - Common error types
//! - Shared traits for the retrieval and generation backends
//! - Configuration management

pub mod config;

pub use config::{
    AppConfig, ConfigError, EmbeddingConfig, EmbeddingProvider, LlmConfig, LlmProvider,
    LoggingConfig, PineconeConfig, RagConfig, ServerConfig,
};

use serde::{Deserialize, Serialize};
use thiserror::Error;

// ============================================================================
// Error Types
// ============================================================================

/// Core error types for MedGenie operations
#[derive(Error, Debug)]
pub enum MedGenieError {
    /// The retrieval backend failed or was unreachable
    #[error("Retrieval error: {0}")]
    RetrievalError(String),

    /// The generation backend failed or returned an error
    #[error("Generation error: {0}")]
    GenerationError(String),

    /// The embedding backend failed
    #[error("Embedding error: {0}")]
    EmbeddingError(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl From<ConfigError> for MedGenieError {
    fn from(err: ConfigError) -> Self {
        MedGenieError::ConfigError(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, MedGenieError>;

// ============================================================================
// Query Models
// ============================================================================

/// Default number of documents retrieved per query
pub const DEFAULT_TOP_K: usize = 5;

/// A user question together with the number of documents to retrieve
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RagQuery {
    /// Free-text question, used verbatim as the cache key
    pub query: String,

    /// Number of documents to retrieve
    #[serde(default = "default_top_k")]
    pub top_k: usize,
}

fn default_top_k() -> usize {
    DEFAULT_TOP_K
}

impl RagQuery {
    /// Create a query with the default `top_k`
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            top_k: DEFAULT_TOP_K,
        }
    }

    /// Set the number of documents to retrieve
    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k;
        self
    }

    /// Check the query is non-empty and `top_k` lies in `1..=max_top_k`
    pub fn validate(&self, max_top_k: usize) -> Result<()> {
        if self.query.trim().is_empty() {
            return Err(MedGenieError::ValidationError(
                "Query cannot be empty".to_string(),
            ));
        }
        if self.top_k == 0 || self.top_k > max_top_k {
            return Err(MedGenieError::ValidationError(format!(
                "top_k must be between 1 and {max_top_k}, got {}",
                self.top_k
            )));
        }
        Ok(())
    }
}

/// Documents retrieved for a query, most similar first
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetrievalResult {
    /// The query as submitted
    pub query: String,

    /// Raw document texts
    pub retrieved_docs: Vec<String>,
}

/// A generated answer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnswerResult {
    pub answer: String,
}

// ============================================================================
// Traits
// ============================================================================

/// Trait for similarity-search backends
///
/// Converts a text query into a vector and returns the texts of the `k`
/// nearest stored documents, most similar first. Recall is best-effort.
#[async_trait::async_trait]
pub trait DocumentRetriever: Send + Sync {
    /// Search for the `k` most similar documents
    async fn similarity_search(&self, query: &str, k: usize) -> Result<Vec<String>>;

    /// Get backend name for logging
    fn name(&self) -> &str;
}

/// Trait for LLM clients
#[async_trait::async_trait]
pub trait LlmClient: Send + Sync {
    /// Generate a response for a fully composed prompt
    async fn generate(&self, prompt: &str) -> Result<String>;

    /// Get model name for logging
    fn model(&self) -> &str;
}

// ============================================================================
// Tests
// ============================================================================
