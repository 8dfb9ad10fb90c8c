//! Azrag Azure - REST clients for Azure OpenAI and Azure AI Search
//!
//! Thin clients over the public REST APIs: chat completions and embeddings for a pair of
//! OpenAI deployments, and query/index/document operations for one search index.

pub mod http;
pub mod index;
pub mod openai;
pub mod search;

pub use http::{Credential, ServiceClientConfig};
pub use index::IndexingResult;
pub use openai::AzureOpenAiClient;
pub use search::AzureSearchClient;
