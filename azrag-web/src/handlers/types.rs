//! Request and response bodies

use azrag_core::{ChatReply, ContextItem};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Body of `POST /chat`
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct ChatRequest {
    /// The user's question; a missing field reads as empty and is rejected
    #[serde(default)]
    #[schema(example = "What does my healthcare plan cost per month?")]
    pub user_input: String,
}

/// A context snippet used to build the answer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ContextSnippet {
    #[schema(example = "benefits.pdf")]
    pub filename: String,
    #[schema(example = "Your healthcare plan costs $100 per month.")]
    pub content: String,
}

/// Answer plus the exact context, in prompt order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ChatResponse {
    #[schema(example = "Your healthcare plan costs $100 per month.")]
    pub response: String,
    pub context: Vec<ContextSnippet>,
}

impl From<ChatReply> for ChatResponse {
    fn from(reply: ChatReply) -> Self {
        Self {
            response: reply.response,
            context: reply
                .context
                .into_iter()
                .map(|ContextItem { filename, content }| ContextSnippet { filename, content })
                .collect(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ErrorResponse {
    pub error: String,
}

/// Health check response
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct HealthResponse {
    #[schema(example = "healthy")]
    pub status: String,
    pub timestamp: chrono::DateTime<chrono::Utc>,
    #[schema(example = "0.1.0")]
    pub version: String,
    #[schema(example = "handbook")]
    pub index: Option<String>,
}
