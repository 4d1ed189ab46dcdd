//! Application state management
//!
//! Author: hephaex@gmail.com

use medgenie_core::{AppConfig, DocumentRetriever, LlmClient, Result};
use medgenie_rag::{create_llm_client, PipelineConfig, RagPipeline};
use medgenie_vector::VectorRetriever;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::RwLock;

/// Per-endpoint request statistics
#[derive(Debug, Clone, Default, Serialize)]
pub struct EndpointMetrics {
    pub requests: u64,
    pub server_errors: u64,
    pub client_errors: u64,
    pub total_latency_us: u64,
}

impl EndpointMetrics {
    /// Mean latency in milliseconds
    pub fn avg_latency_ms(&self) -> f64 {
        if self.requests == 0 {
            0.0
        } else {
            self.total_latency_us as f64 / self.requests as f64 / 1000.0
        }
    }
}

/// Application state shared across handlers
pub struct AppState {
    /// Application configuration
    pub config: AppConfig,
    /// Retrieval + generation pipeline (owns the query cache)
    pub pipeline: Arc<RagPipeline>,
    /// Server start time
    pub start_time: Instant,
    /// Request counter
    pub request_count: AtomicU64,
    /// Ready status
    pub is_ready: AtomicBool,
    /// Request statistics keyed by normalized endpoint
    pub endpoints: RwLock<HashMap<String, EndpointMetrics>>,
}

impl AppState {
    /// Create new application state around an existing pipeline
    pub fn new(config: AppConfig, pipeline: Arc<RagPipeline>) -> Self {
        Self {
            config,
            pipeline,
            start_time: Instant::now(),
            request_count: AtomicU64::new(0),
            is_ready: AtomicBool::new(true),
            endpoints: RwLock::new(HashMap::new()),
        }
    }

    /// Validate the configuration and build the real clients and pipeline
    ///
    /// Fails with a configuration error when a required credential is missing.
    pub fn from_config(config: AppConfig) -> Result<Self> {
        config.validate()?;

        let retriever: Arc<dyn DocumentRetriever> = Arc::new(VectorRetriever::from_config(&config)?);
        let llm_client: Arc<dyn LlmClient> = Arc::from(create_llm_client(&config.llm)?);
        let pipeline = RagPipeline::new(retriever, llm_client, PipelineConfig::from(&config.rag));

        tracing::info!(
            "Pipeline ready: index '{}', model '{}'",
            config.pinecone.index_name,
            config.llm.model
        );

        Ok(Self::new(config, Arc::new(pipeline)))
    }

    /// Increment request counter
    pub fn increment_requests(&self) -> u64 {
        self.request_count.fetch_add(1, Ordering::SeqCst)
    }

    /// Get total request count
    pub fn get_request_count(&self) -> u64 {
        self.request_count.load(Ordering::SeqCst)
    }

    /// Get uptime in seconds
    pub fn uptime_secs(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }

    /// Check if service is ready
    pub fn is_ready(&self) -> bool {
        self.is_ready.load(Ordering::SeqCst)
    }

    /// Set ready status
    pub fn set_ready(&self, ready: bool) {
        self.is_ready.store(ready, Ordering::SeqCst);
    }

    /// Record one finished request
    pub async fn record_request(&self, endpoint: String, status: u16, latency_us: u64) {
        let mut endpoints = self.endpoints.write().await;
        let entry = endpoints.entry(endpoint).or_default();
        entry.requests += 1;
        entry.total_latency_us += latency_us;
        if status >= 500 {
            entry.server_errors += 1;
        } else if status >= 400 {
            entry.client_errors += 1;
        }
    }

    /// Snapshot of the per-endpoint statistics
    pub async fn endpoint_metrics(&self) -> HashMap<String, EndpointMetrics> {
        self.endpoints.read().await.clone()
    }
}
