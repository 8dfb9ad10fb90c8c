//! Chat handler

use super::types::{ChatRequest, ChatResponse, ErrorResponse};
use crate::{AppState, WebError, WebResult};
use axum::{
    extract::{rejection::JsonRejection, State},
    response::Json,
};
use tracing::info;

/// Answer a question from the indexed documents
#[utoipa::path(
    post,
    path = "/chat",
    tag = "Chat",
    summary = "Ask a question",
    description = "Translate the question into a search query, retrieve context with one hybrid search and answer from that context only",
    request_body = ChatRequest,
    responses(
        (status = 200, description = "Question answered", body = ChatResponse),
        (status = 400, description = "Missing or empty user_input", body = ErrorResponse),
        (status = 500, description = "A remote call failed; no partial answer is returned", body = ErrorResponse)
    )
)]
pub async fn chat(
    State(state): State<AppState>,
    payload: Result<Json<ChatRequest>, JsonRejection>,
) -> WebResult<Json<ChatResponse>> {
    let Json(request) = payload.map_err(|e| WebError::BadRequest(e.body_text()))?;

    if request.user_input.trim().is_empty() {
        return Err(WebError::BadRequest("user_input must not be empty".to_string()));
    }

    info!(user_input = %request.user_input, "Processing chat request");

    let reply = state.pipeline.respond(&request.user_input).await?;
    Ok(Json(reply.into()))
}
