//! Azure AI Search query client

use crate::http::{create_http_client, send_json, Credential, ServiceClientConfig};
use async_trait::async_trait;
use azrag_core::{
    AzragError, AzragResult, SearchBackend, SearchConfig, SearchRequest, SearchResult,
};
use serde::Deserialize;
use serde_json::{json, Map, Value};
use tracing::{debug, info};

pub(crate) const COMPONENT: &str = "azure_search";

/// Client for one search index
pub struct AzureSearchClient {
    pub(crate) client: reqwest::Client,
    pub(crate) service: ServiceClientConfig,
    pub(crate) config: SearchConfig,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    value: Vec<Map<String, Value>>,
}

impl AzureSearchClient {
    pub fn new(config: SearchConfig) -> AzragResult<Self> {
        let service = ServiceClientConfig {
            base_url: config.endpoint.clone(),
            credential: Credential::from_parts(
                config.api_key.as_deref(),
                config.bearer_token.as_deref(),
                COMPONENT,
            )?,
            api_version: config.api_version.clone(),
            timeout_seconds: config.timeout_seconds,
        };
        let client = create_http_client(&service)?;

        info!(
            endpoint = %config.endpoint,
            index = %config.index,
            "Created Azure AI Search client"
        );

        Ok(Self {
            client,
            service,
            config,
        })
    }

    pub fn config(&self) -> &SearchConfig {
        &self.config
    }

    /// Wire body for a `docs/search` call
    pub fn request_body(&self, request: &SearchRequest) -> Value {
        let mut body = Map::new();

        if let Some(text) = &request.search_text {
            body.insert("search".to_string(), json!(text));
        }

        if !request.vector_queries.is_empty() {
            let queries: Vec<Value> = request
                .vector_queries
                .iter()
                .map(|q| {
                    json!({
                        "kind": "vector",
                        "vector": q.vector,
                        "k": q.k_nearest_neighbors,
                        "fields": q.fields,
                    })
                })
                .collect();
            body.insert("vectorQueries".to_string(), Value::Array(queries));
        }

        if !request.select.is_empty() {
            body.insert("select".to_string(), json!(request.select.join(",")));
        }
        if !request.search_fields.is_empty() {
            body.insert(
                "searchFields".to_string(),
                json!(request.search_fields.join(",")),
            );
        }
        if let Some(filter) = &request.filter {
            body.insert("filter".to_string(), json!(filter));
        }
        body.insert("top".to_string(), json!(request.top));

        Value::Object(body)
    }

    /// Run one query and return the provider's hits in provider order
    pub async fn query(&self, request: &SearchRequest) -> AzragResult<Vec<SearchResult>> {
        let url = self
            .service
            .url(&format!("indexes/{}/docs/search", self.config.index));

        debug!(
            index = %self.config.index,
            hybrid = request.is_hybrid(),
            top = request.top,
            "Sending search request"
        );

        let response: SearchResponse = send_json(
            self.client.post(&url).json(&self.request_body(request)),
            COMPONENT,
            "search",
        )
        .await
        .map_err(|e| match e {
            AzragError::Service { status, message, .. } => AzragError::search(
                format!("Service returned {}: {}", status, message),
                Some(&self.config.index),
                "search",
            ),
            other => other,
        })?;

        let results = response
            .value
            .into_iter()
            .map(|doc| self.parse_document(doc))
            .collect::<AzragResult<Vec<_>>>()?;

        debug!(hits = results.len(), "Search completed");
        Ok(results)
    }

    /// Split a raw hit into key, content, score and the remaining fields
    fn parse_document(&self, mut doc: Map<String, Value>) -> AzragResult<SearchResult> {
        let score = doc
            .remove("@search.score")
            .and_then(|s| s.as_f64())
            .unwrap_or(0.0);

        let id = match doc.remove(&self.config.key_field) {
            Some(Value::String(id)) => id,
            Some(other) => other.to_string(),
            None => {
                return Err(AzragError::search(
                    format!("Search hit has no '{}' field", self.config.key_field),
                    Some(&self.config.index),
                    "search",
                ))
            }
        };

        let content = match doc.remove(&self.config.content_field) {
            Some(Value::String(content)) => content,
            Some(Value::Null) | None => String::new(),
            Some(other) => other.to_string(),
        };

        // Drop the remaining annotations like @search.rerankerScore
        doc.retain(|key, _| !key.starts_with("@search."));

        Ok(SearchResult {
            id,
            content,
            score,
            fields: doc,
        })
    }
}

#[async_trait]
impl SearchBackend for AzureSearchClient {
    async fn search(&self, request: &SearchRequest) -> AzragResult<Vec<SearchResult>> {
        self.query(request).await
    }

    fn index_name(&self) -> &str {
        &self.config.index
    }
}
