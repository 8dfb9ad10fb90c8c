//! Azrag Web Server
//!
//! Serves the chat pipeline over HTTP: `POST /chat` takes `{"user_input": ...}` and returns
//! the answer together with the context it was built from.

pub mod handlers;
pub mod openapi;
pub mod routes;
pub mod server;
pub mod state;

// Re-export main types
pub use server::AzragServer;
pub use state::AppState;

use axum::{
    extract::DefaultBodyLimit,
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    Router,
};
use azrag_core::AzragError;
use tower_http::trace::TraceLayer;

pub const DEFAULT_HOST: &str = "127.0.0.1";
pub const DEFAULT_PORT: u16 = 5000;

/// Create the main application router
pub fn create_app(state: AppState) -> Router {
    routes::api_routes()
        .layer(TraceLayer::new_for_http())
        .layer(DefaultBodyLimit::max(1024 * 1024))
        .with_state(state)
}

/// Configuration for the web server
#[derive(Debug, Clone)]
pub struct WebConfig {
    pub host: String,
    pub port: u16,
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
        }
    }
}

impl WebConfig {
    /// Read `AZRAG_HOST` / `AZRAG_PORT`, falling back to `127.0.0.1:5000`
    pub fn from_env() -> WebResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> WebResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let host = lookup("AZRAG_HOST").unwrap_or_else(|| DEFAULT_HOST.to_string());
        let port = match lookup("AZRAG_PORT") {
            Some(port) => port
                .trim()
                .parse()
                .map_err(|_| WebError::Config(format!("AZRAG_PORT is not a port: {}", port)))?,
            None => DEFAULT_PORT,
        };
        Ok(Self { host, port })
    }

    /// Get the server address
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Error types for the web server
#[derive(thiserror::Error, Debug)]
pub enum WebError {
    #[error("Server error: {0}")]
    Server(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid request: {0}")]
    BadRequest(String),

    #[error(transparent)]
    Pipeline(#[from] AzragError),
}

/// Result type for web operations
pub type WebResult<T> = Result<T, WebError>;

impl WebError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            WebError::BadRequest(_) => StatusCode::BAD_REQUEST,
            WebError::Pipeline(e) if e.is_client_error() => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for WebError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if let WebError::Pipeline(e) = &self {
            e.log();
        }
        let body = handlers::ErrorResponse {
            error: self.to_string(),
        };
        (status, Json(body)).into_response()
    }
}
