//! Provider traits
//!
//! Each remote collaborator sits behind one of these so that pipeline stages receive their
//! dependencies through constructors instead of reaching for process-wide clients.

use crate::error::{AzragError, AzragResult};
use crate::types::*;
use async_trait::async_trait;

/// Chat completion provider
#[async_trait]
pub trait ChatModel: Send + Sync {
    /// Ordered role/content messages in, free text out
    async fn chat(&self, messages: &[ChatMessage]) -> AzragResult<String>;

    /// Completion constrained to a declared JSON schema
    async fn chat_structured(
        &self,
        _messages: &[ChatMessage],
        schema: &ResponseSchema,
    ) -> AzragResult<serde_json::Value> {
        Err(AzragError::llm(
            format!(
                "structured output ({}) is not supported by this provider",
                schema.name
            ),
            None,
            "chat_structured",
        ))
    }

    /// Name of the deployment or model answering requests
    fn model_name(&self) -> &str;
}

/// Text embedding provider
#[async_trait]
pub trait EmbeddingModel: Send + Sync {
    async fn embed(&self, text: &str) -> AzragResult<Vec<f32>>;

    fn model_name(&self) -> &str;
}

/// Keyword/vector search provider
#[async_trait]
pub trait SearchBackend: Send + Sync {
    /// Run one query; results come back in provider rank order
    async fn search(&self, request: &SearchRequest) -> AzragResult<Vec<SearchResult>>;

    fn index_name(&self) -> &str;
}
