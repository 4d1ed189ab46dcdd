//! MedGenie Vector - Embedding and similarity search
//!
//! Turns a question into an embedding and looks up the nearest document
//! chunks in a Pinecone index. Together these form the retrieval backend
//! used by the RAG pipeline.

use async_trait::async_trait;
use medgenie_core::{AppConfig, DocumentRetriever, MedGenieError, Result};
use std::sync::Arc;

pub mod embedding;
pub mod pinecone_store;

pub use embedding::{create_embedding_client, EmbeddingClient, HuggingFaceEmbedding, OllamaEmbedding};
pub use pinecone_store::PineconeStore;

/// A single nearest-neighbour match
#[derive(Debug, Clone, PartialEq)]
pub struct VectorMatch {
    pub id: String,
    pub score: f32,
    /// Document text, when the stored metadata carries it
    pub text: Option<String>,
}

/// Trait for vector database operations
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Return the `top_k` nearest stored vectors, most similar first
    async fn query(&self, vector: &[f32], top_k: usize) -> Result<Vec<VectorMatch>>;

    /// Get backend name for logging
    fn name(&self) -> &str;
}

/// Embeds the query and searches the vector store
pub struct VectorRetriever {
    embedder: Arc<dyn EmbeddingClient>,
    store: Arc<dyn VectorStore>,
}

impl VectorRetriever {
    pub fn new(embedder: Arc<dyn EmbeddingClient>, store: Arc<dyn VectorStore>) -> Self {
        Self { embedder, store }
    }

    /// Build the HuggingFace/Ollama + Pinecone retriever from config
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        let embedder: Arc<dyn EmbeddingClient> =
            Arc::from(create_embedding_client(&config.embedding)?);
        let store: Arc<dyn VectorStore> = Arc::new(PineconeStore::new(&config.pinecone)?);
        Ok(Self::new(embedder, store))
    }
}

#[async_trait]
impl DocumentRetriever for VectorRetriever {
    async fn similarity_search(&self, query: &str, k: usize) -> Result<Vec<String>> {
        let vector = self
            .embedder
            .embed(query)
            .await
            .map_err(|e| MedGenieError::RetrievalError(e.to_string()))?;

        if vector.len() != self.embedder.dimension() {
            tracing::warn!(
                "Embedding dimension {} differs from expected {}",
                vector.len(),
                self.embedder.dimension()
            );
        }

        let matches = self.store.query(&vector, k).await?;
        tracing::debug!("{} returned {} matches", self.store.name(), matches.len());

        Ok(matches.into_iter().filter_map(|m| m.text).collect())
    }

    fn name(&self) -> &str {
        self.store.name()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FixedEmbedding;

    #[async_trait]
    impl EmbeddingClient for FixedEmbedding {
        async fn embed(&self, _text: &str) -> Result<Vec<f32>> {
            Ok(vec![0.0; 4])
        }

        fn dimension(&self) -> usize {
            4
        }
    }

    struct FailingEmbedding;

    #[async_trait]
    impl EmbeddingClient for FailingEmbedding {
        async fn embed(&self, _text: &str) -> Result<Vec<f32>> {
            Err(MedGenieError::EmbeddingError("model unavailable".to_string()))
        }

        fn dimension(&self) -> usize {
            4
        }
    }

    struct StubStore {
        matches: Vec<VectorMatch>,
        last_top_k: AtomicUsize,
    }

    #[async_trait]
    impl VectorStore for StubStore {
        async fn query(&self, _vector: &[f32], top_k: usize) -> Result<Vec<VectorMatch>> {
            self.last_top_k.store(top_k, Ordering::SeqCst);
            Ok(self.matches.iter().take(top_k).cloned().collect())
        }

        fn name(&self) -> &str {
            "stub"
        }
    }

    fn matched(id: &str, text: Option<&str>) -> VectorMatch {
        VectorMatch {
            id: id.to_string(),
            score: 0.5,
            text: text.map(|t| t.to_string()),
        }
    }

    #[tokio::test]
    async fn test_retriever_keeps_order_and_skips_textless_matches() {
        let store = Arc::new(StubStore {
            matches: vec![
                matched("1", Some("first")),
                matched("2", None),
                matched("3", Some("third")),
            ],
            last_top_k: AtomicUsize::new(0),
        });
        let retriever = VectorRetriever::new(Arc::new(FixedEmbedding), store.clone());

        let docs = retriever.similarity_search("anemia", 3).await.unwrap();
        assert_eq!(docs, vec!["first".to_string(), "third".to_string()]);
        assert_eq!(store.last_top_k.load(Ordering::SeqCst), 3);
        assert_eq!(retriever.name(), "stub");
    }

    #[tokio::test]
    async fn test_embedding_failure_is_retrieval_error() {
        let store = Arc::new(StubStore {
            matches: vec![],
            last_top_k: AtomicUsize::new(0),
        });
        let retriever = VectorRetriever::new(Arc::new(FailingEmbedding), store);

        let err = retriever.similarity_search("anemia", 3).await.unwrap_err();
        assert!(matches!(err, MedGenieError::RetrievalError(_)));
        assert!(err.to_string().contains("model unavailable"));
    }
}
