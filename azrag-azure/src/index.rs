//! Index management: schema creation and document upload/delete

use crate::http::{send, send_json};
use crate::search::{AzureSearchClient, COMPONENT};
use azrag_core::{AzragError, AzragResult};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use tracing::{info, warn};

const HNSW_ALGORITHM: &str = "myHnsw";
const HNSW_PROFILE: &str = "myHnswProfile";

/// Per-document outcome of an upload or delete batch
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexingResult {
    pub key: String,
    pub succeeded: bool,
    pub error_message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct IndexBatchResponse {
    value: Vec<RawIndexingResult>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawIndexingResult {
    key: String,
    status: bool,
    error_message: Option<String>,
}

#[derive(Debug, Clone, Copy)]
enum IndexAction {
    Upload,
    Delete,
}

impl IndexAction {
    fn as_str(&self) -> &'static str {
        match self {
            IndexAction::Upload => "upload",
            IndexAction::Delete => "delete",
        }
    }
}

impl AzureSearchClient {
    /// Schema with a key, a searchable content field and an HNSW vector field
    pub fn index_definition(&self, dimensions: usize) -> Value {
        json!({
            "name": self.config.index,
            "fields": [
                {
                    "name": self.config.key_field,
                    "type": "Edm.String",
                    "key": true,
                    "filterable": true,
                },
                {
                    "name": self.config.content_field,
                    "type": "Edm.String",
                    "searchable": true,
                },
                {
                    "name": self.config.vector_field,
                    "type": "Collection(Edm.Single)",
                    "searchable": true,
                    "dimensions": dimensions,
                    "vectorSearchProfile": HNSW_PROFILE,
                },
            ],
            "vectorSearch": {
                "algorithms": [{ "name": HNSW_ALGORITHM, "kind": "hnsw" }],
                "profiles": [{ "name": HNSW_PROFILE, "algorithm": HNSW_ALGORITHM }],
            },
        })
    }

    pub async fn index_exists(&self) -> AzragResult<bool> {
        let url = self.service.url(&format!("indexes/{}", self.config.index));
        match send(self.client.get(&url), COMPONENT, "index_exists").await {
            Ok(_) => Ok(true),
            Err(AzragError::Service { status: 404, .. }) => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// Create the index unless it already exists; returns whether it was created
    pub async fn create_index_if_missing(&self, dimensions: Option<usize>) -> AzragResult<bool> {
        if self.index_exists().await? {
            info!(index = %self.config.index, "Index already exists");
            return Ok(false);
        }

        let dimensions = dimensions.unwrap_or(self.config.vector_dimensions);
        let url = self.service.url(&format!("indexes/{}", self.config.index));
        send(
            self.client
                .put(&url)
                .json(&self.index_definition(dimensions)),
            COMPONENT,
            "create_index",
        )
        .await?;

        info!(index = %self.config.index, dimensions, "Index created");
        Ok(true)
    }

    /// Upload (insert or replace) documents by key
    pub async fn upload_documents(
        &self,
        documents: Vec<Map<String, Value>>,
    ) -> AzragResult<Vec<IndexingResult>> {
        self.index_batch(IndexAction::Upload, documents).await
    }

    /// Delete documents by key
    pub async fn delete_documents(&self, keys: &[String]) -> AzragResult<Vec<IndexingResult>> {
        let documents = keys
            .iter()
            .map(|key| {
                let mut doc = Map::new();
                doc.insert(self.config.key_field.clone(), json!(key));
                doc
            })
            .collect();
        self.index_batch(IndexAction::Delete, documents).await
    }

    async fn index_batch(
        &self,
        action: IndexAction,
        documents: Vec<Map<String, Value>>,
    ) -> AzragResult<Vec<IndexingResult>> {
        if documents.is_empty() {
            return Ok(Vec::new());
        }

        let value: Vec<Value> = documents
            .into_iter()
            .map(|mut doc| {
                doc.insert("@search.action".to_string(), json!(action.as_str()));
                Value::Object(doc)
            })
            .collect();

        let url = self
            .service
            .url(&format!("indexes/{}/docs/index", self.config.index));

        // 207 Multi-Status still carries a per-document body
        let response: IndexBatchResponse = send_json(
            self.client.post(&url).json(&json!({ "value": value })),
            COMPONENT,
            action.as_str(),
        )
        .await?;

        let results: Vec<IndexingResult> = response
            .value
            .into_iter()
            .map(|raw| IndexingResult {
                key: raw.key,
                succeeded: raw.status,
                error_message: raw.error_message,
            })
            .collect();

        let failed = results.iter().filter(|r| !r.succeeded).count();
        if failed > 0 {
            warn!(
                index = %self.config.index,
                action = action.as_str(),
                failed,
                "Some documents were not indexed"
            );
        } else {
            info!(
                index = %self.config.index,
                action = action.as_str(),
                count = results.len(),
                "Batch indexed"
            );
        }

        Ok(results)
    }
}
