//! OpenAPI description of the HTTP surface

use axum::response::Json;
use utoipa::OpenApi;

use crate::handlers::{ChatRequest, ChatResponse, ContextSnippet, ErrorResponse, HealthResponse};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Azrag Web API",
        version = "0.1.0",
        description = "Retrieval-augmented chat over an Azure AI Search index"
    ),
    servers(
        (url = "http://localhost:5000", description = "Local development server")
    ),
    paths(
        crate::handlers::health_check,
        crate::handlers::chat,
    ),
    components(
        schemas(
            ChatRequest,
            ChatResponse,
            ContextSnippet,
            ErrorResponse,
            HealthResponse,
        )
    ),
    tags(
        (name = "Health", description = "Health check endpoints"),
        (name = "Chat", description = "Question answering"),
    )
)]
pub struct ApiDoc;

/// `GET /api-docs/openapi.json`
pub async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}
