//! Hybrid retrieval against the search index
//!
//! One request per query combines keyword and vector matching; the provider fuses and
//! ranks the two lists. The retriever only embeds the query, bounds the result count and
//! applies the embedding-failure policy. Hits keep the order the provider returned.

use azrag_core::{
    performance::measure_async, AzragResult, EmbeddingFailurePolicy, EmbeddingModel, RagSettings,
    SearchBackend, SearchConfig, SearchRequest, SearchResult, DEFAULT_TOP_K, DEFAULT_VECTOR_FIELD,
};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Retrieval settings
#[derive(Debug, Clone)]
pub struct RetrievalConfig {
    pub top_k: usize,
    pub vector_field: String,
    pub select: Vec<String>,
    pub embedding_failure: EmbeddingFailurePolicy,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            top_k: DEFAULT_TOP_K,
            vector_field: DEFAULT_VECTOR_FIELD.to_string(),
            select: vec!["id".to_string(), "content".to_string()],
            embedding_failure: EmbeddingFailurePolicy::default(),
        }
    }
}

impl RetrievalConfig {
    /// Field names come from the index configuration; `select` is the key and content fields
    pub fn from_settings(settings: &RagSettings, search: &SearchConfig) -> Self {
        Self {
            top_k: settings.top_k,
            vector_field: search.vector_field.clone(),
            select: vec![search.key_field.clone(), search.content_field.clone()],
            embedding_failure: settings.embedding_failure,
        }
    }
}

pub struct HybridRetriever {
    embedder: Arc<dyn EmbeddingModel>,
    search: Arc<dyn SearchBackend>,
    config: RetrievalConfig,
}

impl HybridRetriever {
    pub fn new(
        embedder: Arc<dyn EmbeddingModel>,
        search: Arc<dyn SearchBackend>,
        config: RetrievalConfig,
    ) -> Self {
        Self {
            embedder,
            search,
            config,
        }
    }

    pub fn config(&self) -> &RetrievalConfig {
        &self.config
    }

    /// Retrieve at most `top_k` documents for `query`, best first
    ///
    /// With [`EmbeddingFailurePolicy::SkipRetrieval`] a failed embedding yields an empty list
    /// and no search request is made.
    pub async fn retrieve(&self, query: &str) -> AzragResult<Vec<SearchResult>> {
        let vector = match measure_async("embed_query", self.embedder.embed(query)).await {
            Ok(vector) => vector,
            Err(e) => match self.config.embedding_failure {
                EmbeddingFailurePolicy::SkipRetrieval => {
                    warn!(error = %e, "Query embedding failed, continuing without context");
                    return Ok(Vec::new());
                }
                EmbeddingFailurePolicy::Propagate => return Err(e),
            },
        };

        let request = SearchRequest::hybrid(
            query,
            vector,
            self.config.vector_field.as_str(),
            self.config.top_k,
        )
        .with_select(self.config.select.as_slice());

        let results = measure_async("hybrid_search", self.search.search(&request)).await?;
        let results = bound_results(results, self.config.top_k);

        for result in &results {
            debug!(score = result.score, id = %result.id, "Retrieved document");
        }
        info!(
            index = self.search.index_name(),
            count = results.len(),
            "Retrieved context"
        );

        Ok(results)
    }
}

/// Keep the provider's first `k` hits in the order returned
///
/// The provider may rank by a score other than `@search.score` (semantic reranking), so
/// nothing is re-sorted here.
pub fn bound_results(mut results: Vec<SearchResult>, k: usize) -> Vec<SearchResult> {
    results.truncate(k);
    results
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hit(id: &str, score: f64) -> SearchResult {
        SearchResult {
            id: id.to_string(),
            content: String::new(),
            score,
            fields: Default::default(),
        }
    }

    #[test]
    fn test_bound_keeps_provider_order() {
        let results = bound_results(
            vec![hit("a", 0.2), hit("b", 0.9), hit("c", 0.2), hit("d", 0.5)],
            3,
        );
        let ids: Vec<_> = results.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b", "c"]);

        assert_eq!(bound_results(vec![hit("x", 1.0)], 3).len(), 1);
    }

    #[test]
    fn test_from_settings_uses_index_fields() {
        let search = SearchConfig {
            endpoint: "https://contoso.search.windows.net".to_string(),
            api_key: Some("key".to_string()),
            bearer_token: None,
            index: "handbook".to_string(),
            api_version: "2024-07-01".to_string(),
            key_field: "docId".to_string(),
            content_field: "chunk".to_string(),
            vector_field: "chunkVector".to_string(),
            vector_dimensions: 1536,
            timeout_seconds: None,
        };
        let settings = RagSettings {
            top_k: 5,
            embedding_failure: EmbeddingFailurePolicy::Propagate,
        };

        let config = RetrievalConfig::from_settings(&settings, &search);
        assert_eq!(config.select, vec!["docId", "chunk"]);
        assert_eq!(config.vector_field, "chunkVector");
        assert_eq!(config.top_k, 5);
        assert_eq!(config.embedding_failure, EmbeddingFailurePolicy::Propagate);
    }
}
