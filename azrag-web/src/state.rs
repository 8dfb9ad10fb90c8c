//! Shared application state

use crate::{WebConfig, WebResult};
use azrag_core::AppConfig;
use azrag_rag::ChatPipeline;
use std::sync::Arc;
use tracing::info;

/// State handed to every handler
#[derive(Clone)]
pub struct AppState {
    pub config: WebConfig,
    /// Stateless between requests; shared read-only
    pub pipeline: Arc<ChatPipeline>,
    /// Index name reported by `/health`
    pub index: Option<String>,
}

impl AppState {
    pub fn new(config: WebConfig, pipeline: Arc<ChatPipeline>) -> Self {
        Self {
            config,
            pipeline,
            index: None,
        }
    }

    /// Build the Azure-backed pipeline from service configuration
    pub fn from_app_config(config: WebConfig, app_config: &AppConfig) -> WebResult<Self> {
        let pipeline = ChatPipeline::from_config(app_config)?;
        info!(index = %app_config.search.index, "Application state initialized");

        Ok(Self {
            config,
            pipeline: Arc::new(pipeline),
            index: Some(app_config.search.index.clone()),
        })
    }
}
