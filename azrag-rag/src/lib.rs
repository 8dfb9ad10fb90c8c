//! Azrag RAG - retrieval-augmented chat over an Azure AI Search index
//!
//! A question is rewritten into a search query, the query is embedded and sent as one
//! hybrid search, and the hits become the context of a grounded chat completion.

pub mod generator;
pub mod prompts;
pub mod query_translator;
pub mod rag_pipeline;
pub mod retriever;

pub use generator::*;
pub use prompts::*;
pub use query_translator::*;
pub use rag_pipeline::*;
pub use retriever::*;
