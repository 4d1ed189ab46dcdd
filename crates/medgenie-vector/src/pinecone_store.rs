//! Pinecone implementation for vector search
//!
//! Talks to the Pinecone REST API. The data-plane host of the index is
//! either configured directly or resolved once from the control plane and
//! memoized, so the first query (or the startup warm-up) pays for it.
//!
//! Author: hephaex@gmail.com

use async_trait::async_trait;
use medgenie_core::{MedGenieError, PineconeConfig, Result};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::sync::OnceCell;

use crate::{VectorMatch, VectorStore};

const API_VERSION: &str = "2024-07";

/// Pinecone vector store implementation
pub struct PineconeStore {
    client: Client,
    api_key: String,
    index_name: String,
    control_plane_url: String,
    namespace: Option<String>,
    text_key: String,
    host: OnceCell<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct QueryRequest<'a> {
    vector: &'a [f32],
    top_k: usize,
    include_metadata: bool,
    include_values: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    namespace: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
struct QueryResponse {
    #[serde(default)]
    matches: Vec<Match>,
}

#[derive(Debug, Deserialize)]
struct Match {
    id: String,
    #[serde(default)]
    score: f32,
    #[serde(default)]
    metadata: Option<serde_json::Map<String, serde_json::Value>>,
}

#[derive(Debug, Deserialize)]
struct DescribeIndexResponse {
    host: String,
}

impl PineconeStore {
    /// Create a new Pinecone client
    pub fn new(config: &PineconeConfig) -> Result<Self> {
        let api_key = config
            .api_key
            .clone()
            .ok_or_else(|| MedGenieError::ConfigError("Pinecone API key required".to_string()))?;

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| MedGenieError::ConfigError(format!("Failed to build HTTP client: {e}")))?;

        let host = match &config.host {
            Some(h) => OnceCell::new_with(Some(normalize_host(h))),
            None => OnceCell::new(),
        };

        Ok(Self {
            client,
            api_key,
            index_name: config.index_name.clone(),
            control_plane_url: config.control_plane_url.trim_end_matches('/').to_string(),
            namespace: config.namespace.clone(),
            text_key: config.text_key.clone(),
            host,
        })
    }

    /// Data-plane base URL, resolving it from the control plane on first use
    async fn host(&self) -> Result<&str> {
        self.host
            .get_or_try_init(|| self.describe_index_host())
            .await
            .map(String::as_str)
    }

    async fn describe_index_host(&self) -> Result<String> {
        tracing::info!("Resolving Pinecone host for index '{}'", self.index_name);

        let response = self
            .client
            .get(format!(
                "{}/indexes/{}",
                self.control_plane_url, self.index_name
            ))
            .header("Api-Key", &self.api_key)
            .header("X-Pinecone-API-Version", API_VERSION)
            .send()
            .await
            .map_err(|e| MedGenieError::RetrievalError(format!("Describe index failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(MedGenieError::RetrievalError(format!(
                "Pinecone describe index error ({status}): {error_text}"
            )));
        }

        let described: DescribeIndexResponse = response.json().await.map_err(|e| {
            MedGenieError::RetrievalError(format!("Failed to parse describe index response: {e}"))
        })?;

        Ok(normalize_host(&described.host))
    }

    fn to_matches(&self, response: QueryResponse) -> Vec<VectorMatch> {
        response
            .matches
            .into_iter()
            .map(|m| {
                let text = m
                    .metadata
                    .as_ref()
                    .and_then(|md| md.get(&self.text_key))
                    .and_then(|v| v.as_str())
                    .map(|s| s.to_string());

                VectorMatch {
                    id: m.id,
                    score: m.score,
                    text,
                }
            })
            .collect()
    }
}

#[async_trait]
impl VectorStore for PineconeStore {
    async fn query(&self, vector: &[f32], top_k: usize) -> Result<Vec<VectorMatch>> {
        let host = self.host().await?;

        let request = QueryRequest {
            vector,
            top_k,
            include_metadata: true,
            include_values: false,
            namespace: self.namespace.as_deref(),
        };

        let response = self
            .client
            .post(format!("{host}/query"))
            .header("Api-Key", &self.api_key)
            .header("X-Pinecone-API-Version", API_VERSION)
            .json(&request)
            .send()
            .await
            .map_err(|e| MedGenieError::RetrievalError(format!("Vector search failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(MedGenieError::RetrievalError(format!(
                "Pinecone query error ({status}): {error_text}"
            )));
        }

        let result: QueryResponse = response.json().await.map_err(|e| {
            MedGenieError::RetrievalError(format!("Failed to parse query response: {e}"))
        })?;

        Ok(self.to_matches(result))
    }

    fn name(&self) -> &str {
        "pinecone"
    }
}

/// Prefix bare hostnames with `https://` and drop trailing slashes
fn normalize_host(host: &str) -> String {
    let host = host.trim().trim_end_matches('/');
    if host.starts_with("http://") || host.starts_with("https://") {
        host.to_string()
    } else {
        format!("https://{host}")
    }
}
