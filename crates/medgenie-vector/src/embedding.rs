//! Embedding client for generating vector representations of queries
//!
//! Supports the HuggingFace Inference API and Ollama embedding APIs.
//!
//! Author: hephaex@gmail.com

use async_trait::async_trait;
use medgenie_core::{EmbeddingConfig, EmbeddingProvider, MedGenieError, Result};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

// ============================================================================
// Embedding Trait
// ============================================================================

/// Trait for embedding generation
#[async_trait]
pub trait EmbeddingClient: Send + Sync {
    /// Generate embedding for a single text
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Get embedding dimension
    fn dimension(&self) -> usize;
}

fn build_http_client(timeout_secs: u64) -> Result<Client> {
    Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .build()
        .map_err(|e| MedGenieError::ConfigError(format!("Failed to build HTTP client: {e}")))
}

// ============================================================================
// HuggingFace Embedding Client
// ============================================================================

/// HuggingFace Inference API (feature-extraction pipeline) client
pub struct HuggingFaceEmbedding {
    client: Client,
    base_url: String,
    api_token: Option<String>,
    model: String,
    dimension: usize,
}

#[derive(Debug, Serialize)]
struct HuggingFaceRequest<'a> {
    inputs: &'a str,
}

/// Feature-extraction output shapes
///
/// Sentence-transformers models return one pooled vector; plain encoder
/// models return one vector per token, which are mean-pooled here.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum HuggingFaceResponse {
    Pooled(Vec<f32>),
    Batch(Vec<Vec<f32>>),
    Tokens(Vec<Vec<Vec<f32>>>),
}

impl HuggingFaceResponse {
    fn into_embedding(self) -> Option<Vec<f32>> {
        match self {
            Self::Pooled(v) => (!v.is_empty()).then_some(v),
            Self::Batch(mut batch) => {
                if batch.len() == 1 {
                    batch.pop()
                } else {
                    mean_pool(&batch)
                }
            }
            Self::Tokens(mut batch) => batch.pop().and_then(|tokens| mean_pool(&tokens)),
        }
    }
}

/// Average a list of equally sized vectors
fn mean_pool(vectors: &[Vec<f32>]) -> Option<Vec<f32>> {
    let first = vectors.first()?;
    let mut sum = vec![0.0f32; first.len()];
    for v in vectors {
        if v.len() != sum.len() {
            return None;
        }
        for (acc, x) in sum.iter_mut().zip(v) {
            *acc += x;
        }
    }
    let n = vectors.len() as f32;
    Some(sum.into_iter().map(|x| x / n).collect())
}

impl HuggingFaceEmbedding {
    /// Create a new HuggingFace embedding client
    pub fn new(
        base_url: impl Into<String>,
        model: impl Into<String>,
        api_token: Option<String>,
        timeout_secs: u64,
    ) -> Result<Self> {
        let model = model.into();
        let dimension = match model.as_str() {
            "sentence-transformers/all-mpnet-base-v2" => 768,
            "sentence-transformers/all-MiniLM-L6-v2" => 384,
            "BAAI/bge-large-en-v1.5" => 1024,
            _ => 768,
        };

        Ok(Self {
            client: build_http_client(timeout_secs)?,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_token,
            model,
            dimension,
        })
    }

    /// Create from config
    pub fn from_config(config: &EmbeddingConfig) -> Result<Self> {
        Self::new(
            config.huggingface_url.clone(),
            config.model.clone(),
            config.api_token.clone(),
            config.timeout_secs,
        )
    }

    fn endpoint(&self) -> String {
        format!("{}/{}/pipeline/feature-extraction", self.base_url, self.model)
    }
}

#[async_trait]
impl EmbeddingClient for HuggingFaceEmbedding {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let mut request = self
            .client
            .post(self.endpoint())
            .json(&HuggingFaceRequest { inputs: text });

        if let Some(token) = &self.api_token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await.map_err(|e| {
            MedGenieError::EmbeddingError(format!("HuggingFace request failed: {e}"))
        })?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(MedGenieError::EmbeddingError(format!(
                "HuggingFace error ({status}): {error_text}"
            )));
        }

        let result: HuggingFaceResponse = response.json().await.map_err(|e| {
            MedGenieError::EmbeddingError(format!("Failed to parse embedding response: {e}"))
        })?;

        result
            .into_embedding()
            .ok_or_else(|| MedGenieError::EmbeddingError("No embedding returned".to_string()))
    }

    fn dimension(&self) -> usize {
        self.dimension
    }
}

// ============================================================================
// Ollama Embedding Client
// ============================================================================

/// Ollama embedding API client
pub struct OllamaEmbedding {
    client: Client,
    base_url: String,
    model: String,
    dimension: usize,
}

#[derive(Debug, Serialize)]
struct OllamaEmbeddingRequest<'a> {
    model: &'a str,
    prompt: &'a str,
}

#[derive(Debug, Deserialize)]
struct OllamaEmbeddingResponse {
    embedding: Vec<f32>,
}

impl OllamaEmbedding {
    /// Create a new Ollama embedding client
    pub fn new(base_url: impl Into<String>, model: impl Into<String>, timeout_secs: u64) -> Result<Self> {
        let model = model.into();
        let dimension = match model.as_str() {
            "nomic-embed-text" => 768,
            "mxbai-embed-large" => 1024,
            "all-minilm" => 384,
            _ => 768, // Default for most models
        };

        Ok(Self {
            client: build_http_client(timeout_secs)?,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            model,
            dimension,
        })
    }

    /// Create from config
    pub fn from_config(config: &EmbeddingConfig) -> Result<Self> {
        Self::new(
            config.ollama_url.clone(),
            config.model.clone(),
            config.timeout_secs,
        )
    }
}

#[async_trait]
impl EmbeddingClient for OllamaEmbedding {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let request = OllamaEmbeddingRequest {
            model: &self.model,
            prompt: text,
        };

        let response = self
            .client
            .post(format!("{}/api/embeddings", self.base_url))
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                MedGenieError::EmbeddingError(format!("Ollama embedding request failed: {e}"))
            })?;

        if !response.status().is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(MedGenieError::EmbeddingError(format!(
                "Ollama embedding error: {error_text}"
            )));
        }

        let result: OllamaEmbeddingResponse = response.json().await.map_err(|e| {
            MedGenieError::EmbeddingError(format!("Failed to parse embedding response: {e}"))
        })?;

        Ok(result.embedding)
    }

    fn dimension(&self) -> usize {
        self.dimension
    }
}

// ============================================================================
// Factory function
// ============================================================================

/// Create an embedding client from config
pub fn create_embedding_client(config: &EmbeddingConfig) -> Result<Box<dyn EmbeddingClient>> {
    match config.provider {
        EmbeddingProvider::HuggingFace => Ok(Box::new(HuggingFaceEmbedding::from_config(config)?)),
        EmbeddingProvider::Ollama => Ok(Box::new(OllamaEmbedding::from_config(config)?)),
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_huggingface_dimension() {
        let client = HuggingFaceEmbedding::new(
            "https://example.invalid/models",
            "sentence-transformers/all-mpnet-base-v2",
            None,
            5,
        )
        .unwrap();
        assert_eq!(client.dimension(), 768);
        assert_eq!(
            client.endpoint(),
            "https://example.invalid/models/sentence-transformers/all-mpnet-base-v2/pipeline/feature-extraction"
        );
    }

    #[test]
    fn test_ollama_dimension() {
        let client = OllamaEmbedding::new("http://localhost:11434", "mxbai-embed-large", 5).unwrap();
        assert_eq!(client.dimension(), 1024);
    }

    #[test]
    fn test_parse_pooled_response() {
        let parsed: HuggingFaceResponse = serde_json::from_str("[0.1, 0.2, 0.3]").unwrap();
        assert_eq!(parsed.into_embedding(), Some(vec![0.1, 0.2, 0.3]));

        let parsed: HuggingFaceResponse = serde_json::from_str("[[0.5, 0.25]]").unwrap();
        assert_eq!(parsed.into_embedding(), Some(vec![0.5, 0.25]));
    }

    #[test]
    fn test_parse_token_level_response_is_mean_pooled() {
        let parsed: HuggingFaceResponse =
            serde_json::from_str("[[[1.0, 2.0], [3.0, 4.0]]]").unwrap();
        assert_eq!(parsed.into_embedding(), Some(vec![2.0, 3.0]));
    }

    #[test]
    fn test_mean_pool_rejects_ragged_input() {
        assert_eq!(mean_pool(&[vec![1.0, 2.0], vec![1.0]]), None);
        assert_eq!(mean_pool(&[]), None);
    }

    #[test]
    fn test_factory() {
        let config = EmbeddingConfig {
            provider: EmbeddingProvider::Ollama,
            model: "nomic-embed-text".to_string(),
            ..Default::default()
        };
        let client = create_embedding_client(&config).unwrap();
        assert_eq!(client.dimension(), 768);
    }
}
