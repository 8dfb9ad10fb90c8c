//! Route tests for the azrag web server

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use azrag_core::{
    async_trait, AzragError, AzragResult, ChatMessage, ChatModel, EmbeddingModel, SearchBackend,
    SearchRequest, SearchResult,
};
use azrag_rag::{ChatPipeline, RetrievalConfig, QUERY_TRANSLATION_PROMPT};
use azrag_web::{create_app, AppState, WebConfig};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tower::ServiceExt;

struct EchoChat {
    fail_answers: bool,
}

#[async_trait]
impl ChatModel for EchoChat {
    async fn chat(&self, messages: &[ChatMessage]) -> AzragResult<String> {
        if messages[0].content == QUERY_TRANSLATION_PROMPT {
            return Ok("healthcare plan monthly cost".to_string());
        }
        if self.fail_answers {
            return Err(AzragError::Service {
                status: 503,
                message: "model overloaded".to_string(),
                context: azrag_core::ErrorContext::new("test"),
            });
        }
        Ok("Your healthcare plan costs $100 per month.".to_string())
    }

    fn model_name(&self) -> &str {
        "echo"
    }
}

struct UnitEmbedder;

#[async_trait]
impl EmbeddingModel for UnitEmbedder {
    async fn embed(&self, _text: &str) -> AzragResult<Vec<f32>> {
        Ok(vec![1.0, 0.0])
    }

    fn model_name(&self) -> &str {
        "unit"
    }
}

#[derive(Default)]
struct CountingIndex {
    calls: AtomicUsize,
}

#[async_trait]
impl SearchBackend for CountingIndex {
    async fn search(&self, _request: &SearchRequest) -> AzragResult<Vec<SearchResult>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(vec![
            SearchResult {
                id: "benefits.pdf".to_string(),
                content: "Your healthcare plan costs $100 per month.".to_string(),
                score: 0.03,
                fields: Default::default(),
            },
            SearchResult {
                id: "handbook.pdf".to_string(),
                content: "Dress code is business casual.".to_string(),
                score: 0.01,
                fields: Default::default(),
            },
        ])
    }

    fn index_name(&self) -> &str {
        "handbook"
    }
}

fn app_with(fail_answers: bool, index: Arc<CountingIndex>) -> axum::Router {
    let pipeline = ChatPipeline::from_providers(
        Arc::new(EchoChat { fail_answers }),
        Arc::new(UnitEmbedder),
        index,
        RetrievalConfig::default(),
    );
    create_app(AppState::new(WebConfig::default(), Arc::new(pipeline)))
}

fn post_chat(body: impl Into<Body>) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/chat")
        .header(header::CONTENT_TYPE, "application/json")
        .body(body.into())
        .unwrap()
}

async fn json_body(response: axum::response::Response) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn chat_returns_answer_and_context() {
    let app = app_with(false, Arc::new(CountingIndex::default()));

    let response = app
        .oneshot(post_chat(
            json!({"user_input": "What does my healthcare plan cost per month?"}).to_string(),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["response"], "Your healthcare plan costs $100 per month.");
    assert_eq!(
        body["context"],
        json!([
            {"filename": "benefits.pdf", "content": "Your healthcare plan costs $100 per month."},
            {"filename": "handbook.pdf", "content": "Dress code is business casual."}
        ])
    );
}

#[tokio::test]
async fn empty_or_missing_input_is_rejected() {
    for body in [json!({"user_input": "   "}), json!({})] {
        let index = Arc::new(CountingIndex::default());
        let app = app_with(false, index.clone());

        let response = app.oneshot(post_chat(body.to_string())).await.unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = json_body(response).await;
        assert!(body["error"].as_str().unwrap().contains("user_input"));
        assert_eq!(index.calls.load(Ordering::SeqCst), 0);
    }
}

#[tokio::test]
async fn malformed_json_is_a_bad_request() {
    let app = app_with(false, Arc::new(CountingIndex::default()));

    let response = app.oneshot(post_chat("{not json")).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(json_body(response).await["error"].is_string());
}

#[tokio::test]
async fn pipeline_failure_is_a_server_error_without_partial_reply() {
    let index = Arc::new(CountingIndex::default());
    let app = app_with(true, index.clone());

    let response = app
        .oneshot(post_chat(json!({"user_input": "cost?"}).to_string()))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body = json_body(response).await;
    assert!(body.get("response").is_none());
    assert!(body.get("context").is_none());
    assert!(body["error"].as_str().unwrap().contains("model overloaded"));
    assert_eq!(index.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn health_and_openapi_are_served() {
    let app = app_with(false, Arc::new(CountingIndex::default()));

    let response = app
        .clone()
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["status"], "healthy");
    assert!(body["timestamp"].is_string());

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api-docs/openapi.json")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert!(body["paths"]["/chat"]["post"].is_object());
}
