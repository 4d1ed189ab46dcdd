//! OpenAPI document for the HTTP surface
//!
//! Author: hephaex@gmail.com

use crate::error::ApiError;
use crate::handlers::health::{BuildInfo, HealthResponse, ReadinessChecks, ReadinessResponse};
use crate::handlers::query::{AnswerResponse, QueryRequest, RetrieveResponse};
use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "MedGenie API",
        description = "Retrieval-augmented medical question answering"
    ),
    paths(
        crate::handlers::query::retrieve_handler,
        crate::handlers::query::answer_handler,
        crate::handlers::health::health_check,
        crate::handlers::health::readiness_check,
    ),
    components(schemas(
        QueryRequest,
        RetrieveResponse,
        AnswerResponse,
        ApiError,
        HealthResponse,
        BuildInfo,
        ReadinessResponse,
        ReadinessChecks,
    )),
    tags(
        (name = "query", description = "Document retrieval and answer generation"),
        (name = "health", description = "Service probes")
    )
)]
pub struct ApiDoc;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_openapi_lists_query_paths() {
        let doc = ApiDoc::openapi();
        assert!(doc.paths.paths.contains_key("/retrieve"));
        assert!(doc.paths.paths.contains_key("/answer"));
        assert!(doc.paths.paths.contains_key("/health"));
    }
}
