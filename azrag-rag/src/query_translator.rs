//! Rewrites a free-form question into a search query

use crate::prompts::QUERY_TRANSLATION_PROMPT;
use azrag_core::{AzragError, AzragResult, ChatMessage, ChatModel};
use std::sync::Arc;
use tracing::debug;

pub struct QueryTranslator {
    chat: Arc<dyn ChatModel>,
}

impl QueryTranslator {
    pub fn new(chat: Arc<dyn ChatModel>) -> Self {
        Self { chat }
    }

    /// Ask the chat model for a search query
    ///
    /// Provider failures propagate. The user's text is never used as a fallback query.
    pub async fn translate(&self, user_input: &str) -> AzragResult<String> {
        let messages = [
            ChatMessage::system(QUERY_TRANSLATION_PROMPT),
            ChatMessage::user(user_input),
        ];

        let query = self.chat.chat(&messages).await?;
        let query = query.trim();

        if query.is_empty() {
            return Err(AzragError::llm(
                "Query translation returned an empty search query",
                Some(self.chat.model_name()),
                "translate_query",
            ));
        }

        debug!(search_query = %query, "Translated user input");
        Ok(query.to_string())
    }
}
