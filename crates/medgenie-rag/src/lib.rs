//! MedGenie RAG - Retrieval-Augmented Generation pipeline
//!
//! This crate composes the retrieval backend and the answer-generation
//! backend into the two operations served over HTTP:
//! - `retrieve`: similarity search, fronted by a TTL query cache
//! - `answer`: similarity search (uncached), prompt assembly, generation
//!   and cleanup of the model output
//!
//! Author: hephaex@gmail.com

use medgenie_core::{
    AnswerResult, DocumentRetriever, LlmClient, MedGenieError, RagConfig, RagQuery, Result,
    RetrievalResult,
};
use std::sync::Arc;
use std::time::Instant;
use tokio::task::JoinHandle;

pub mod cache;
pub mod llm;

pub use cache::{CacheConfig, CacheStats, CacheStatsReport, QueryCache};
pub use llm::{create_llm_client, GeminiClient, OllamaClient};

/// Returned by `answer` when retrieval finds nothing; the LLM is not called
pub const NO_DOCUMENTS_MESSAGE: &str =
    "Sorry, no relevant documents found. Please refine your query.";

/// Sentence the model is instructed to reply with when the context does not help
pub const REFUSAL_MESSAGE: &str = "Sorry, I couldn't find relevant information. Please refine your query to be more related to medical topics.";

const WARM_UP_QUERY: &str = "test";

// ============================================================================
// Configuration
// ============================================================================

/// RAG pipeline configuration
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Retrieval cache settings
    pub cache: CacheConfig,

    /// Largest `top_k` a request may ask for
    pub max_top_k: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            cache: CacheConfig::default(),
            max_top_k: 50,
        }
    }
}

impl From<&RagConfig> for PipelineConfig {
    fn from(config: &RagConfig) -> Self {
        Self {
            cache: CacheConfig::from(config),
            max_top_k: config.max_top_k,
        }
    }
}

// ============================================================================
// RAG Pipeline
// ============================================================================

/// Retrieval + generation orchestrator
///
/// Owns the query cache; share it behind an `Arc` for the lifetime of the
/// process.
pub struct RagPipeline {
    /// Embedding + similarity search backend
    retriever: Arc<dyn DocumentRetriever>,

    /// LLM client
    llm_client: Arc<dyn LlmClient>,

    /// Retrieval results keyed by query text
    cache: QueryCache,

    /// Configuration
    config: PipelineConfig,
}

impl RagPipeline {
    /// Create a new pipeline
    pub fn new(
        retriever: Arc<dyn DocumentRetriever>,
        llm_client: Arc<dyn LlmClient>,
        config: PipelineConfig,
    ) -> Self {
        Self {
            retriever,
            llm_client,
            cache: QueryCache::with_config(&config.cache),
            config,
        }
    }

    /// The retrieval cache
    pub fn cache(&self) -> &QueryCache {
        &self.cache
    }

    /// Largest accepted `top_k`
    pub fn max_top_k(&self) -> usize {
        self.config.max_top_k
    }

    /// Retrieve documents for a query, serving repeats from the cache
    ///
    /// The cache key is the query text alone, so a repeat with another
    /// `top_k` inside the TTL gets the cached list.
    pub async fn retrieve(&self, query: &RagQuery) -> Result<RetrievalResult> {
        if let Some(docs) = self.cache.get(&query.query).await {
            tracing::debug!("Cache hit for query ({} docs)", docs.len());
            return Ok(RetrievalResult {
                query: query.query.clone(),
                retrieved_docs: docs,
            });
        }

        tracing::debug!("Cache miss, searching {}", self.retriever.name());
        let docs = self
            .retriever
            .similarity_search(&query.query, query.top_k)
            .await
            .map_err(into_retrieval_error)?;

        self.cache.put(&query.query, docs.clone()).await;

        Ok(RetrievalResult {
            query: query.query.clone(),
            retrieved_docs: docs,
        })
    }

    /// Answer a query from freshly retrieved context
    ///
    /// Always goes to the retriever; the cache is neither read nor written.
    pub async fn answer(&self, query: &RagQuery) -> Result<AnswerResult> {
        let start_time = Instant::now();

        let docs = self
            .retriever
            .similarity_search(&query.query, query.top_k)
            .await
            .map_err(into_generation_error)?;
        tracing::debug!("Retrieved {} documents", docs.len());

        if docs.is_empty() {
            tracing::info!("No relevant documents found, skipping generation");
            return Ok(AnswerResult {
                answer: NO_DOCUMENTS_MESSAGE.to_string(),
            });
        }

        let context = build_context(&docs);
        let prompt = build_prompt(&query.query, &context);

        tracing::info!(
            "Calling {} with prompt length: {} chars",
            self.llm_client.model(),
            prompt.len()
        );
        let raw = self
            .llm_client
            .generate(&prompt)
            .await
            .map_err(into_generation_error)?;

        let answer = clean_answer(&raw);
        tracing::info!(
            "Answer generated: {} chars in {} ms",
            answer.len(),
            start_time.elapsed().as_millis()
        );

        Ok(AnswerResult { answer })
    }

    /// Issue one throw-away retrieval to open connections and resolve lazy state
    ///
    /// Bypasses the cache and discards the result.
    pub async fn warm_up(&self) -> Result<()> {
        self.retriever
            .similarity_search(WARM_UP_QUERY, 1)
            .await
            .map(|_| ())
            .map_err(into_retrieval_error)
    }

    /// Run [`warm_up`](Self::warm_up) as a detached task
    ///
    /// Returns immediately; failure is logged and never reaches the caller.
    pub fn spawn_warm_up(self: &Arc<Self>) -> JoinHandle<()> {
        let pipeline = Arc::clone(self);
        tokio::spawn(async move {
            let start = Instant::now();
            match pipeline.warm_up().await {
                Ok(()) => tracing::info!(
                    "Warm-up retrieval completed in {} ms",
                    start.elapsed().as_millis()
                ),
                Err(e) => tracing::warn!("Warm-up retrieval failed: {}", e),
            }
        })
    }
}

fn into_retrieval_error(err: MedGenieError) -> MedGenieError {
    match err {
        MedGenieError::RetrievalError(_) => err,
        other => MedGenieError::RetrievalError(other.to_string()),
    }
}

fn into_generation_error(err: MedGenieError) -> MedGenieError {
    match err {
        MedGenieError::GenerationError(_) => err,
        other => MedGenieError::GenerationError(other.to_string()),
    }
}

// ============================================================================
// Prompt Assembly
// ============================================================================

/// Join document texts with a blank line, in retrieval order
pub fn build_context(docs: &[String]) -> String {
    docs.join("\n\n")
}

/// Fill the medical-assistant template with the question and context
pub fn build_prompt(question: &str, context: &str) -> String {
    format!(
        "You are a medical assistant trained to answer questions based on the following context.\n\
         Give a concise and accurate answer using only the information in the context, \
         and avoid unnecessary formatting or symbols.\n\
         If you do not know the answer or if the context does not seem relevant, please respond with:\n\
         \"{REFUSAL_MESSAGE}\"\n\
         \n\
         Question: {question}\n\
         Context: {context}\n\
         Answer:"
    )
}

/// Trim the model output and strip markdown bold markers
pub fn clean_answer(raw: &str) -> String {
    raw.trim().replace("**", "")
}

// ============================================================================
// Tests
// ============================================================================
