//! Grounded answer generation

use crate::prompts::{build_user_input, format_context, RAG_SYSTEM_PROMPT};
use azrag_core::{AzragResult, ChatMessage, ChatModel, ContextItem};
use std::sync::Arc;
use tracing::debug;

pub struct AnswerGenerator {
    chat: Arc<dyn ChatModel>,
}

impl AnswerGenerator {
    pub fn new(chat: Arc<dyn ChatModel>) -> Self {
        Self { chat }
    }

    /// Messages sent for one answer
    pub fn messages(&self, user_input: &str, context: &[ContextItem]) -> Vec<ChatMessage> {
        let context_text = format_context(context);
        debug!(context = %context_text, "Prepared context");

        vec![
            ChatMessage::system(RAG_SYSTEM_PROMPT),
            ChatMessage::user(build_user_input(&context_text, user_input)),
        ]
    }

    /// Answer `user_input` from `context`; an empty context is sent as-is
    pub async fn generate(&self, user_input: &str, context: &[ContextItem]) -> AzragResult<String> {
        self.chat.chat(&self.messages(user_input, context)).await
    }
}
