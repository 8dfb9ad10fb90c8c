//! A throwaway HTTP service standing in for Azure endpoints

#![allow(dead_code)]

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{header, HeaderMap, Method, StatusCode, Uri};
use axum::response::IntoResponse;
use axum::Router;
use azrag_core::{OpenAiConfig, SearchConfig};
use serde_json::Value;
use std::sync::{Arc, Mutex};
use tokio::net::TcpListener;

/// One request as the fake service saw it
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: Method,
    pub path: String,
    pub query: Option<String>,
    pub headers: HeaderMap,
    pub body: Value,
}

type Responder = Arc<dyn Fn(&RecordedRequest) -> (StatusCode, String) + Send + Sync>;

#[derive(Clone)]
struct FakeState {
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
    responder: Responder,
}

pub struct FakeService {
    pub address: String,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
}

impl FakeService {
    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn last_request(&self) -> RecordedRequest {
        self.requests().pop().expect("no request recorded")
    }

    pub fn openai_config(&self) -> OpenAiConfig {
        OpenAiConfig {
            endpoint: self.address.clone(),
            api_key: Some("test-openai-key".to_string()),
            bearer_token: None,
            chat_deployment: "gpt-4o".to_string(),
            embedding_deployment: "text-embedding-ada-002".to_string(),
            api_version: "2024-05-01-preview".to_string(),
            temperature: 0.0,
            max_tokens: None,
            timeout_seconds: Some(5),
        }
    }

    pub fn search_config(&self) -> SearchConfig {
        SearchConfig {
            endpoint: self.address.clone(),
            api_key: Some("test-search-key".to_string()),
            bearer_token: None,
            index: "handbook".to_string(),
            api_version: "2024-07-01".to_string(),
            key_field: "id".to_string(),
            content_field: "content".to_string(),
            vector_field: "contentVector".to_string(),
            vector_dimensions: 1536,
            timeout_seconds: Some(5),
        }
    }
}

async fn record(
    State(state): State<FakeState>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> impl IntoResponse {
    let request = RecordedRequest {
        method,
        path: uri.path().to_string(),
        query: uri.query().map(str::to_string),
        headers,
        body: serde_json::from_slice(&body).unwrap_or(Value::Null),
    };
    let (status, body) = (state.responder)(&request);
    state.requests.lock().unwrap().push(request);

    (status, [(header::CONTENT_TYPE, "application/json")], body)
}

/// Serve every request with `responder`, on an ephemeral port
pub async fn spawn_fake<F>(responder: F) -> FakeService
where
    F: Fn(&RecordedRequest) -> (StatusCode, String) + Send + Sync + 'static,
{
    let requests = Arc::new(Mutex::new(Vec::new()));
    let state = FakeState {
        requests: requests.clone(),
        responder: Arc::new(responder),
    };

    let app = Router::new().fallback(record).with_state(state);
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind random port");
    let port = listener.local_addr().unwrap().port();

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    FakeService {
        address: format!("http://127.0.0.1:{}", port),
        requests,
    }
}
