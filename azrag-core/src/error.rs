//! Unified error handling
//!
//! Structured error types carrying an [`ErrorContext`]. The taxonomy is deliberately small:
//! configuration errors are fatal at startup, remote call errors abort the current
//! operation, and nothing in here retries.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{error, warn};

pub type AzragResult<T> = Result<T, AzragError>;

/// Error context providing additional information for debugging
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorContext {
    /// Unique error ID for tracking
    pub error_id: String,
    /// Timestamp when error occurred
    pub timestamp: DateTime<Utc>,
    /// Component where error originated
    pub component: String,
    /// Operation being performed when error occurred
    pub operation: Option<String>,
    /// Additional metadata
    pub metadata: std::collections::HashMap<String, String>,
    /// Recovery suggestions
    pub recovery_suggestions: Vec<String>,
}

impl ErrorContext {
    pub fn new(component: &str) -> Self {
        Self {
            error_id: uuid::Uuid::new_v4().to_string(),
            timestamp: Utc::now(),
            component: component.to_string(),
            operation: None,
            metadata: std::collections::HashMap::new(),
            recovery_suggestions: Vec::new(),
        }
    }

    pub fn with_operation(mut self, operation: &str) -> Self {
        self.operation = Some(operation.to_string());
        self
    }

    pub fn with_metadata(mut self, key: &str, value: &str) -> Self {
        self.metadata.insert(key.to_string(), value.to_string());
        self
    }

    pub fn with_suggestion(mut self, suggestion: &str) -> Self {
        self.recovery_suggestions.push(suggestion.to_string());
        self
    }
}

/// Main error type for azrag
#[derive(Error, Debug)]
pub enum AzragError {
    #[error("Configuration error: {message}")]
    Config {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
        context: ErrorContext,
    },

    #[error("Network error: {message}")]
    Network {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
        context: ErrorContext,
    },

    #[error("Service returned {status}: {message}")]
    Service {
        status: u16,
        message: String,
        context: ErrorContext,
    },

    #[error("LLM error: {message}")]
    Llm {
        message: String,
        deployment: Option<String>,
        context: ErrorContext,
    },

    #[error("Embedding error: {message}")]
    Embedding {
        message: String,
        deployment: Option<String>,
        context: ErrorContext,
    },

    #[error("Search error: {message}")]
    Search {
        message: String,
        index: Option<String>,
        context: ErrorContext,
    },

    #[error("Validation error: {message}")]
    Validation {
        message: String,
        field: Option<String>,
        context: ErrorContext,
    },

    #[error("Evaluation error: {message}")]
    Evaluation {
        message: String,
        metric: Option<String>,
        context: ErrorContext,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Internal error: {message}")]
    Internal {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
        context: ErrorContext,
    },
}

impl AzragError {
    /// Get the error context
    pub fn context(&self) -> Option<&ErrorContext> {
        match self {
            AzragError::Config { context, .. } => Some(context),
            AzragError::Network { context, .. } => Some(context),
            AzragError::Service { context, .. } => Some(context),
            AzragError::Llm { context, .. } => Some(context),
            AzragError::Embedding { context, .. } => Some(context),
            AzragError::Search { context, .. } => Some(context),
            AzragError::Validation { context, .. } => Some(context),
            AzragError::Evaluation { context, .. } => Some(context),
            AzragError::Internal { context, .. } => Some(context),
            AzragError::Io(_) | AzragError::Serialization(_) => None,
        }
    }

    /// Whether the caller, not a remote service, is at fault
    pub fn is_client_error(&self) -> bool {
        matches!(self, AzragError::Validation { .. })
    }

    /// HTTP status reported by a remote service, if any
    pub fn service_status(&self) -> Option<u16> {
        match self {
            AzragError::Service { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Log the error with appropriate level
    pub fn log(&self) {
        let error_id = self.context().map(|c| c.error_id.as_str());
        match self {
            AzragError::Config { .. } => {
                error!(error_id = ?error_id, error = %self, "Configuration error");
            }
            AzragError::Validation { .. } => {
                warn!(error_id = ?error_id, error = %self, "Rejected invalid input");
            }
            AzragError::Network { .. } | AzragError::Service { .. } => {
                error!(error_id = ?error_id, error = %self, "Remote call failed");
            }
            _ => {
                error!(error_id = ?error_id, error = %self, "Error occurred");
            }
        }
    }

    pub fn llm(message: impl Into<String>, deployment: Option<&str>, operation: &str) -> Self {
        AzragError::Llm {
            message: message.into(),
            deployment: deployment.map(str::to_string),
            context: ErrorContext::new("llm").with_operation(operation),
        }
    }

    pub fn embedding(message: impl Into<String>, deployment: Option<&str>) -> Self {
        AzragError::Embedding {
            message: message.into(),
            deployment: deployment.map(str::to_string),
            context: ErrorContext::new("embedding").with_operation("embed"),
        }
    }

    pub fn search(message: impl Into<String>, index: Option<&str>, operation: &str) -> Self {
        AzragError::Search {
            message: message.into(),
            index: index.map(str::to_string),
            context: ErrorContext::new("search").with_operation(operation),
        }
    }
}

/// Convenience macros for creating errors with context
#[macro_export]
macro_rules! config_error {
    ($msg:expr, $component:expr) => {
        $crate::AzragError::Config {
            message: $msg.to_string(),
            source: None,
            context: $crate::ErrorContext::new($component)
                .with_suggestion("Check your environment or .env file")
                .with_suggestion("Run 'azrag config --validate' to inspect the loaded values"),
        }
    };
}

#[macro_export]
macro_rules! validation_error {
    ($msg:expr, $field:expr, $component:expr) => {
        $crate::AzragError::Validation {
            message: $msg.to_string(),
            field: Some($field.to_string()),
            context: $crate::ErrorContext::new($component)
                .with_suggestion("Check the field value and format"),
        }
    };
}
