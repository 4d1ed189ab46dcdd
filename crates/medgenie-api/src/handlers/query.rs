//! Retrieval and answer handlers
//!
//! Author: hephaex@gmail.com

use crate::error::AppError;
use crate::state::AppState;
use axum::{
    extract::{rejection::JsonRejection, State},
    Json,
};
use medgenie_core::{AnswerResult, RagQuery, RetrievalResult, DEFAULT_TOP_K};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::ToSchema;

/// Query request body
#[derive(Debug, Deserialize, ToSchema)]
pub struct QueryRequest {
    /// User's question
    #[schema(example = "What is hypertension?")]
    pub query: String,

    /// Number of documents to retrieve
    #[serde(default = "default_top_k")]
    #[schema(example = 5, default = 5)]
    pub top_k: usize,
}

fn default_top_k() -> usize {
    DEFAULT_TOP_K
}

impl From<QueryRequest> for RagQuery {
    fn from(req: QueryRequest) -> Self {
        RagQuery::new(req.query).with_top_k(req.top_k)
    }
}

/// Retrieval response body
#[derive(Debug, Serialize, ToSchema)]
pub struct RetrieveResponse {
    /// The query as submitted
    #[schema(example = "What is hypertension?")]
    pub query: String,

    /// Document texts, most similar first
    pub retrieved_docs: Vec<String>,
}

impl From<RetrievalResult> for RetrieveResponse {
    fn from(result: RetrievalResult) -> Self {
        Self {
            query: result.query,
            retrieved_docs: result.retrieved_docs,
        }
    }
}

/// Answer response body
#[derive(Debug, Serialize, ToSchema)]
pub struct AnswerResponse {
    /// Generated answer, or a fixed message when nothing relevant was found
    #[schema(example = "Hypertension is high blood pressure.")]
    pub answer: String,
}

impl From<AnswerResult> for AnswerResponse {
    fn from(result: AnswerResult) -> Self {
        Self {
            answer: result.answer,
        }
    }
}

/// Retrieve documents similar to the query
#[utoipa::path(
    post,
    path = "/retrieve",
    tag = "query",
    request_body = QueryRequest,
    responses(
        (status = 200, description = "Documents retrieved", body = RetrieveResponse),
        (status = 400, description = "Invalid request", body = crate::error::ApiError),
        (status = 500, description = "Retrieval backend failed", body = crate::error::ApiError)
    )
)]
pub async fn retrieve_handler(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<QueryRequest>, JsonRejection>,
) -> Result<Json<RetrieveResponse>, AppError> {
    state.increment_requests();

    let Json(req) = payload?;
    let query = RagQuery::from(req);
    query.validate(state.pipeline.max_top_k())?;

    let result = state.pipeline.retrieve(&query).await.map_err(|e| {
        tracing::error!(query = %query.query, top_k = query.top_k, "Retrieval failed: {}", e);
        e
    })?;

    Ok(Json(result.into()))
}

/// Answer the query from retrieved context
#[utoipa::path(
    post,
    path = "/answer",
    tag = "query",
    request_body = QueryRequest,
    responses(
        (status = 200, description = "Answer generated (or no-documents message)", body = AnswerResponse),
        (status = 400, description = "Invalid request", body = crate::error::ApiError),
        (status = 500, description = "Retrieval or generation failed", body = crate::error::ApiError)
    )
)]
pub async fn answer_handler(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<QueryRequest>, JsonRejection>,
) -> Result<Json<AnswerResponse>, AppError> {
    state.increment_requests();

    let Json(req) = payload?;
    let query = RagQuery::from(req);
    query.validate(state.pipeline.max_top_k())?;

    let result = state.pipeline.answer(&query).await.map_err(|e| {
        tracing::error!(query = %query.query, top_k = query.top_k, "Answer failed: {}", e);
        e
    })?;

    Ok(Json(result.into()))
}
