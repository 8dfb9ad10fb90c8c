//! Azure OpenAI client against a fake service

mod helpers;

use axum::http::{Method, StatusCode};
use azrag_azure::AzureOpenAiClient;
use azrag_core::{
    AzragError, ChatMessage, ChatModel, EmbeddingModel, ResponseSchema, ToolDefinition,
};
use helpers::spawn_fake;
use serde_json::json;
use tokio::sync::mpsc;

#[tokio::test]
async fn chat_posts_to_deployment_with_api_key() {
    let fake = spawn_fake(|_| {
        (
            StatusCode::OK,
            json!({
                "choices": [{"message": {"role": "assistant", "content": "healthcare plan monthly cost"}}],
                "usage": {"total_tokens": 42}
            })
            .to_string(),
        )
    })
    .await;

    let client = AzureOpenAiClient::new(fake.openai_config()).unwrap();
    let reply = client
        .chat(&[
            ChatMessage::system("rewrite"),
            ChatMessage::user("What does my healthcare plan cost per month?"),
        ])
        .await
        .unwrap();

    assert_eq!(reply, "healthcare plan monthly cost");

    let request = fake.last_request();
    assert_eq!(request.method, Method::POST);
    assert_eq!(request.path, "/openai/deployments/gpt-4o/chat/completions");
    assert_eq!(request.query.as_deref(), Some("api-version=2024-05-01-preview"));
    assert_eq!(request.headers["api-key"], "test-openai-key");
    assert_eq!(request.body["temperature"], 0.0);
    assert_eq!(request.body["messages"][1]["role"], "user");
}

#[tokio::test]
async fn bearer_token_is_used_without_key() {
    let fake = spawn_fake(|_| {
        (
            StatusCode::OK,
            json!({"choices": [{"message": {"content": "ok"}}]}).to_string(),
        )
    })
    .await;

    let mut config = fake.openai_config();
    config.api_key = None;
    config.bearer_token = Some("entra-token".to_string());

    let client = AzureOpenAiClient::new(config).unwrap();
    client.chat(&[ChatMessage::user("hi")]).await.unwrap();

    let request = fake.last_request();
    assert_eq!(request.headers["authorization"], "Bearer entra-token");
    assert!(request.headers.get("api-key").is_none());
}

#[tokio::test]
async fn service_errors_carry_status_and_message() {
    let fake = spawn_fake(|_| {
        (
            StatusCode::TOO_MANY_REQUESTS,
            json!({"error": {"code": "429", "message": "Rate limit reached"}}).to_string(),
        )
    })
    .await;

    let client = AzureOpenAiClient::new(fake.openai_config()).unwrap();
    let err = client.chat(&[ChatMessage::user("hi")]).await.unwrap_err();

    match err {
        AzragError::Service {
            status, message, ..
        } => {
            assert_eq!(status, 429);
            assert!(message.contains("Rate limit reached"));
        }
        other => panic!("Expected Service error, got {:?}", other),
    }
    // No retries
    assert_eq!(fake.requests().len(), 1);
}

#[tokio::test]
async fn embedding_uses_embedding_deployment() {
    let fake = spawn_fake(|_| {
        (
            StatusCode::OK,
            json!({"data": [{"index": 0, "embedding": [0.1, 0.2, 0.3]}]}).to_string(),
        )
    })
    .await;

    let client = AzureOpenAiClient::new(fake.openai_config()).unwrap();
    let vector = client.embed("healthcare plan cost").await.unwrap();

    assert_eq!(vector, vec![0.1, 0.2, 0.3]);
    let request = fake.last_request();
    assert_eq!(
        request.path,
        "/openai/deployments/text-embedding-ada-002/embeddings"
    );
    assert_eq!(request.body["input"][0], "healthcare plan cost");
}

#[tokio::test]
async fn embedding_failure_is_an_embedding_error() {
    let fake = spawn_fake(|_| {
        (
            StatusCode::NOT_FOUND,
            json!({"error": {"code": "DeploymentNotFound", "message": "missing"}}).to_string(),
        )
    })
    .await;

    let client = AzureOpenAiClient::new(fake.openai_config()).unwrap();
    let err = client.embed("anything").await.unwrap_err();
    assert!(matches!(err, AzragError::Embedding { .. }));
}

#[tokio::test]
async fn structured_output_declares_schema_and_parses_json() {
    let fake = spawn_fake(|_| {
        (
            StatusCode::OK,
            json!({
                "choices": [{"message": {"content": "{\"thoughts\":\"matches\",\"stars\":5}"}}]
            })
            .to_string(),
        )
    })
    .await;

    let client = AzureOpenAiClient::new(fake.openai_config()).unwrap();
    let schema = ResponseSchema {
        name: "evaluation".to_string(),
        schema: json!({"type": "object"}),
    };
    let value = client
        .chat_structured(&[ChatMessage::user("rate")], &schema)
        .await
        .unwrap();

    assert_eq!(value["stars"], 5);
    let request = fake.last_request();
    assert_eq!(request.body["response_format"]["type"], "json_schema");
    assert_eq!(request.body["response_format"]["json_schema"]["name"], "evaluation");
    assert_eq!(request.body["response_format"]["json_schema"]["strict"], true);
}

#[tokio::test]
async fn tool_calls_are_returned() {
    let fake = spawn_fake(|_| {
        (
            StatusCode::OK,
            json!({
                "choices": [{"message": {
                    "content": null,
                    "tool_calls": [{
                        "id": "call_1",
                        "type": "function",
                        "function": {"name": "get_current_weather", "arguments": "{\"location\":\"Seattle\"}"}
                    }]
                }}],
                "usage": {"total_tokens": 97}
            })
            .to_string(),
        )
    })
    .await;

    let client = AzureOpenAiClient::new(fake.openai_config()).unwrap();
    let tools = vec![ToolDefinition {
        name: "get_current_weather".to_string(),
        description: "Get the current weather in a given location".to_string(),
        parameters: json!({
            "type": "object",
            "properties": {"location": {"type": "string"}},
            "required": ["location"]
        }),
    }];

    let completion = client
        .chat_with_tools(&[ChatMessage::user("Weather in Seattle?")], &tools)
        .await
        .unwrap();

    assert!(completion.content.is_none());
    assert_eq!(completion.total_tokens, Some(97));
    assert_eq!(completion.tool_calls.len(), 1);
    assert_eq!(completion.tool_calls[0].name, "get_current_weather");
    assert_eq!(completion.tool_calls[0].arguments, "{\"location\":\"Seattle\"}");

    let request = fake.last_request();
    assert_eq!(request.body["tools"][0]["type"], "function");
    assert_eq!(
        request.body["tools"][0]["function"]["name"],
        "get_current_weather"
    );
}

#[tokio::test]
async fn tool_results_complete_the_conversation() {
    let fake = spawn_fake(|request| {
        let answered = request.body["messages"]
            .as_array()
            .map(|messages| messages.iter().any(|m| m["role"] == "tool"))
            .unwrap_or(false);
        let body = if answered {
            json!({"choices": [{"message": {"content": "Order 12345 arrives on Friday."}}]})
        } else {
            json!({"choices": [{"message": {
                "content": null,
                "tool_calls": [{
                    "id": "call_7",
                    "type": "function",
                    "function": {"name": "get_delivery_date", "arguments": "{\"order_id\":\"12345\"}"}
                }]
            }}]})
        };
        (StatusCode::OK, body.to_string())
    })
    .await;

    let client = AzureOpenAiClient::new(fake.openai_config()).unwrap();
    let tools = vec![ToolDefinition {
        name: "get_delivery_date".to_string(),
        description: "Get the delivery date for a customer's order".to_string(),
        parameters: json!({
            "type": "object",
            "properties": {"order_id": {"type": "string"}},
            "required": ["order_id"]
        }),
    }];

    let mut messages = vec![
        ChatMessage::system("You are a helpful customer support assistant."),
        ChatMessage::user("When will order #12345 arrive?"),
    ];
    let first = client.chat_with_tools(&messages, &tools).await.unwrap();
    messages.push(first.to_message());
    for call in &first.tool_calls {
        messages.push(ChatMessage::tool_result(&call.id, "Friday"));
    }

    let second = client.chat_with_tools(&messages, &tools).await.unwrap();
    assert_eq!(second.content.as_deref(), Some("Order 12345 arrives on Friday."));
    assert!(second.tool_calls.is_empty());

    let sent = &fake.last_request().body["messages"];
    assert_eq!(sent[2]["role"], "assistant");
    assert!(sent[2]["content"].is_null());
    assert_eq!(sent[2]["tool_calls"][0]["id"], "call_7");
    assert_eq!(sent[2]["tool_calls"][0]["type"], "function");
    assert_eq!(sent[2]["tool_calls"][0]["function"]["name"], "get_delivery_date");
    assert_eq!(sent[3]["role"], "tool");
    assert_eq!(sent[3]["tool_call_id"], "call_7");
    assert_eq!(sent[3]["content"], "Friday");
    assert!(sent[1].get("tool_call_id").is_none());
}

#[tokio::test]
async fn stream_forwards_deltas_in_order() {
    let fake = spawn_fake(|_| {
        let body = [
            r#"data: {"choices":[],"prompt_filter_results":[]}"#,
            r#"data: {"choices":[{"delta":{"role":"assistant"}}]}"#,
            r#"data: {"choices":[{"delta":{"content":"Your plan "}}]}"#,
            r#"data: {"choices":[{"delta":{"content":"costs $100."}}]}"#,
            "data: [DONE]",
        ]
        .join("\n\n");
        (StatusCode::OK, body)
    })
    .await;

    let client = AzureOpenAiClient::new(fake.openai_config()).unwrap();
    let (tx, mut rx) = mpsc::channel(16);

    let full = client
        .chat_stream(&[ChatMessage::user("cost?")], tx)
        .await
        .unwrap();

    assert_eq!(full, "Your plan costs $100.");
    let mut deltas = Vec::new();
    while let Some(delta) = rx.recv().await {
        deltas.push(delta);
    }
    assert_eq!(deltas, vec!["Your plan ", "costs $100."]);
    assert_eq!(fake.last_request().body["stream"], true);
}
