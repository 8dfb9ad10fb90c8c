//! The chat flow: translate, retrieve, generate, respond
//!
//! Stages run strictly in order for one request. Any failure ends the request with that
//! error; there is no partial reply and no retry.

use crate::generator::AnswerGenerator;
use crate::query_translator::QueryTranslator;
use crate::retriever::{HybridRetriever, RetrievalConfig};
use azrag_azure::{AzureOpenAiClient, AzureSearchClient};
use azrag_core::{
    log_operation_error, log_operation_start, log_operation_success, validation_error, AppConfig,
    AzragResult, ChatModel, ChatReply, ContextItem, EmbeddingModel, SearchBackend,
};
use std::fmt;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

/// Where a request is in the flow
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineStage {
    Received,
    QueryTranslated,
    ContextRetrieved,
    AnswerGenerated,
    Responded,
}

impl fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PipelineStage::Received => "received",
            PipelineStage::QueryTranslated => "query-translated",
            PipelineStage::ContextRetrieved => "context-retrieved",
            PipelineStage::AnswerGenerated => "answer-generated",
            PipelineStage::Responded => "responded",
        };
        f.write_str(name)
    }
}

pub struct ChatPipeline {
    translator: QueryTranslator,
    retriever: HybridRetriever,
    generator: AnswerGenerator,
}

impl ChatPipeline {
    pub fn new(
        translator: QueryTranslator,
        retriever: HybridRetriever,
        generator: AnswerGenerator,
    ) -> Self {
        Self {
            translator,
            retriever,
            generator,
        }
    }

    /// Wire the flow from provider handles; the same chat model translates and answers
    pub fn from_providers(
        chat: Arc<dyn ChatModel>,
        embedder: Arc<dyn EmbeddingModel>,
        search: Arc<dyn SearchBackend>,
        retrieval: RetrievalConfig,
    ) -> Self {
        Self::new(
            QueryTranslator::new(chat.clone()),
            HybridRetriever::new(embedder, search, retrieval),
            AnswerGenerator::new(chat),
        )
    }

    /// Build Azure clients from configuration
    pub fn from_config(config: &AppConfig) -> AzragResult<Self> {
        let openai = Arc::new(AzureOpenAiClient::new(config.openai.clone())?);
        let search = Arc::new(AzureSearchClient::new(config.search.clone())?);
        let retrieval = RetrievalConfig::from_settings(&config.rag, &config.search);

        info!(
            chat_deployment = %config.openai.chat_deployment,
            index = %config.search.index,
            top_k = retrieval.top_k,
            "Chat pipeline ready"
        );

        Ok(Self::from_providers(openai.clone(), openai, search, retrieval))
    }

    pub fn retriever(&self) -> &HybridRetriever {
        &self.retriever
    }

    /// Answer one question and echo the context the answer was built from
    pub async fn respond(&self, user_input: &str) -> AzragResult<ChatReply> {
        if user_input.trim().is_empty() {
            return Err(validation_error!(
                "user_input must not be empty",
                "user_input",
                "chat_pipeline"
            ));
        }

        log_operation_start!("chat_pipeline");
        let start_time = Instant::now();
        let mut stage = PipelineStage::Received;
        debug!(%stage, user_input = %user_input, "User input");

        let result = self.run(user_input, &mut stage).await;

        match &result {
            Ok(reply) => log_operation_success!(
                "chat_pipeline",
                context_items = reply.context.len(),
                total_time_ms = start_time.elapsed().as_millis() as u64
            ),
            Err(e) => log_operation_error!("chat_pipeline", e, stage = %stage),
        }

        result
    }

    async fn run(&self, user_input: &str, stage: &mut PipelineStage) -> AzragResult<ChatReply> {
        let search_query = self.translator.translate(user_input).await?;
        advance(stage, PipelineStage::QueryTranslated);

        let results = self.retriever.retrieve(&search_query).await?;
        let context: Vec<ContextItem> = results.iter().map(ContextItem::from).collect();
        advance(stage, PipelineStage::ContextRetrieved);

        let response = self.generator.generate(user_input, &context).await?;
        advance(stage, PipelineStage::AnswerGenerated);

        let reply = ChatReply { response, context };
        advance(stage, PipelineStage::Responded);

        Ok(reply)
    }
}

fn advance(stage: &mut PipelineStage, next: PipelineStage) {
    *stage = next;
    debug!(stage = %next, "Pipeline stage");
}
