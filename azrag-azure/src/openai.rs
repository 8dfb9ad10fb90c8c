//! Azure OpenAI REST client
//!
//! Chat completions (plain, streamed, schema-constrained, tool-enabled) and embeddings
//! against `/openai/deployments/{deployment}/...`.

use crate::http::{create_http_client, network_error, send, send_json, Credential, ServiceClientConfig};
use async_trait::async_trait;
use azrag_core::{
    AzragError, AzragResult, ChatMessage, ChatModel, EmbeddingModel, ErrorContext, OpenAiConfig,
    ResponseSchema, ToolCall, ToolCompletion, ToolDefinition,
};
use serde::Deserialize;
use serde_json::{json, Value};
use tokio::sync::mpsc;
use tracing::{debug, info};

const COMPONENT: &str = "azure_openai";

/// Azure OpenAI client bound to one chat deployment and one embedding deployment
pub struct AzureOpenAiClient {
    client: reqwest::Client,
    service: ServiceClientConfig,
    config: OpenAiConfig,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
    usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: Option<String>,
    #[serde(default)]
    tool_calls: Vec<RawToolCall>,
}

#[derive(Debug, Deserialize)]
struct RawToolCall {
    id: String,
    function: RawFunctionCall,
}

#[derive(Debug, Deserialize)]
struct RawFunctionCall {
    name: String,
    arguments: String,
}

#[derive(Debug, Deserialize)]
struct Usage {
    total_tokens: u64,
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
}

impl AzureOpenAiClient {
    pub fn new(config: OpenAiConfig) -> AzragResult<Self> {
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
            chat_deployment = %config.chat_deployment,
            embedding_deployment = %config.embedding_deployment,
            "Created Azure OpenAI client"
        );

        Ok(Self {
            client,
            service,
            config,
        })
    }

    pub fn config(&self) -> &OpenAiConfig {
        &self.config
    }

    fn deployment_url(&self, deployment: &str, operation: &str) -> String {
        self.service
            .url(&format!("openai/deployments/{}/{}", deployment, operation))
    }

    /// Request body shared by every chat call
    pub fn chat_body(&self, messages: &[ChatMessage]) -> Value {
        let messages: Vec<Value> = messages.iter().map(wire_message).collect();
        let mut body = json!({
            "messages": messages,
            "temperature": self.config.temperature,
        });
        if let Some(max_tokens) = self.config.max_tokens {
            body["max_tokens"] = json!(max_tokens);
        }
        body
    }

    async fn post_chat(&self, body: &Value, operation: &str) -> AzragResult<ChatCompletionResponse> {
        let url = self.deployment_url(&self.config.chat_deployment, "chat/completions");
        debug!(messages = body["messages"].as_array().map(Vec::len), "Sending chat completion");
        send_json(self.client.post(&url).json(body), COMPONENT, operation).await
    }

    fn first_message(
        &self,
        response: ChatCompletionResponse,
        operation: &str,
    ) -> AzragResult<ResponseMessage> {
        response
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message)
            .ok_or_else(|| {
                AzragError::llm(
                    "Completion contained no choices",
                    Some(&self.config.chat_deployment),
                    operation,
                )
            })
    }

    /// One non-streamed completion
    pub async fn complete(&self, messages: &[ChatMessage]) -> AzragResult<String> {
        let response = self.post_chat(&self.chat_body(messages), "chat").await?;
        let message = self.first_message(response, "chat")?;

        message.content.ok_or_else(|| {
            AzragError::llm(
                "No text content in completion",
                Some(&self.config.chat_deployment),
                "chat",
            )
        })
    }

    /// Completion constrained to `schema`, returned as parsed JSON
    pub async fn complete_structured(
        &self,
        messages: &[ChatMessage],
        schema: &ResponseSchema,
    ) -> AzragResult<Value> {
        let mut body = self.chat_body(messages);
        body["response_format"] = json!({
            "type": "json_schema",
            "json_schema": {
                "name": schema.name,
                "schema": schema.schema,
                "strict": true,
            }
        });

        let response = self.post_chat(&body, "chat_structured").await?;
        let content = self
            .first_message(response, "chat_structured")?
            .content
            .unwrap_or_default();

        debug!(content = %content, "Structured output received");

        serde_json::from_str(&content).map_err(|e| {
            AzragError::llm(
                format!("Structured output was not valid JSON: {}", e),
                Some(&self.config.chat_deployment),
                "chat_structured",
            )
        })
    }

    /// Completion that may answer with tool calls instead of text
    pub async fn chat_with_tools(
        &self,
        messages: &[ChatMessage],
        tools: &[ToolDefinition],
    ) -> AzragResult<ToolCompletion> {
        let mut body = self.chat_body(messages);
        body["tools"] = Value::Array(
            tools
                .iter()
                .map(|tool| {
                    json!({
                        "type": "function",
                        "function": {
                            "name": tool.name,
                            "description": tool.description,
                            "parameters": tool.parameters,
                        }
                    })
                })
                .collect(),
        );

        let response = self.post_chat(&body, "chat_with_tools").await?;
        let total_tokens = response.usage.as_ref().map(|u| u.total_tokens);
        let message = self.first_message(response, "chat_with_tools")?;

        let tool_calls: Vec<ToolCall> = message
            .tool_calls
            .into_iter()
            .map(|call| ToolCall {
                id: call.id,
                name: call.function.name,
                arguments: call.function.arguments,
            })
            .collect();

        if let Some(first) = tool_calls.first() {
            debug!(function = %first.name, arguments = %first.arguments, "Tool call requested");
        }

        Ok(ToolCompletion {
            content: message.content,
            tool_calls,
            total_tokens,
        })
    }

    /// Stream a completion, forwarding each content delta to `sink`
    ///
    /// Returns the concatenated text once the stream ends. A closed receiver does not stop
    /// the stream; the remaining deltas are still collected.
    pub async fn chat_stream(
        &self,
        messages: &[ChatMessage],
        sink: mpsc::Sender<String>,
    ) -> AzragResult<String> {
        let mut body = self.chat_body(messages);
        body["stream"] = json!(true);

        let url = self.deployment_url(&self.config.chat_deployment, "chat/completions");
        let mut response = send(self.client.post(&url).json(&body), COMPONENT, "chat_stream").await?;

        let mut full_response = String::new();
        let mut buffer: Vec<u8> = Vec::new();
        let mut finished = false;

        while !finished {
            let chunk = response
                .chunk()
                .await
                .map_err(|e| network_error(e, COMPONENT, "chat_stream"))?;
            let Some(chunk) = chunk else { break };
            buffer.extend_from_slice(&chunk);

            while let Some(pos) = buffer.iter().position(|b| *b == b'\n') {
                let line: Vec<u8> = buffer.drain(..=pos).collect();
                let line = String::from_utf8_lossy(&line);
                match parse_sse_line(line.trim()) {
                    SseLine::Done => {
                        finished = true;
                        break;
                    }
                    SseLine::Delta(text) => {
                        full_response.push_str(&text);
                        let _ = sink.send(text).await;
                    }
                    SseLine::Skip => {}
                }
            }
        }

        // A final line without a trailing newline
        if !finished {
            let rest = String::from_utf8_lossy(&buffer).to_string();
            if let SseLine::Delta(text) = parse_sse_line(rest.trim()) {
                full_response.push_str(&text);
                let _ = sink.send(text).await;
            }
        }

        info!(chars = full_response.len(), "Streaming completed");
        Ok(full_response)
    }

    /// Embed one text with the embedding deployment
    pub async fn create_embedding(&self, text: &str) -> AzragResult<Vec<f32>> {
        let url = self.deployment_url(&self.config.embedding_deployment, "embeddings");
        let body = json!({ "input": [text] });

        let response: EmbeddingResponse = send_json(
            self.client.post(&url).json(&body),
            COMPONENT,
            "embed",
        )
        .await
        .map_err(|e| match e {
            AzragError::Service { status, message, .. } => AzragError::Embedding {
                message: format!("Service returned {}: {}", status, message),
                deployment: Some(self.config.embedding_deployment.clone()),
                context: ErrorContext::new(COMPONENT).with_operation("embed"),
            },
            other => other,
        })?;

        let embedding = response
            .data
            .into_iter()
            .next()
            .map(|d| d.embedding)
            .ok_or_else(|| {
                AzragError::embedding(
                    "Embedding response contained no data",
                    Some(&self.config.embedding_deployment),
                )
            })?;

        debug!(dimensions = embedding.len(), "Embedding generated");
        Ok(embedding)
    }
}

#[derive(Debug, PartialEq)]
enum SseLine {
    Delta(String),
    Done,
    Skip,
}

/// Interpret one server-sent-events line of a streamed completion
fn parse_sse_line(line: &str) -> SseLine {
    let Some(data) = line.strip_prefix("data:") else {
        return SseLine::Skip;
    };
    let data = data.trim();
    if data == "[DONE]" {
        return SseLine::Done;
    }

    let Ok(value) = serde_json::from_str::<Value>(data) else {
        return SseLine::Skip;
    };

    // Azure sends an initial chunk with content filter results and no choices
    match value
        .get("choices")
        .and_then(|c| c.get(0))
        .and_then(|c| c.get("delta"))
        .and_then(|d| d.get("content"))
        .and_then(|c| c.as_str())
    {
        Some(text) if !text.is_empty() => SseLine::Delta(text.to_string()),
        _ => SseLine::Skip,
    }
}

/// Chat message in the chat completions wire format
fn wire_message(message: &ChatMessage) -> Value {
    let mut wire = json!({ "role": message.role, "content": message.content });

    if !message.tool_calls.is_empty() {
        if message.content.is_empty() {
            wire["content"] = Value::Null;
        }
        wire["tool_calls"] = message
            .tool_calls
            .iter()
            .map(|call| {
                json!({
                    "id": call.id,
                    "type": "function",
                    "function": { "name": call.name, "arguments": call.arguments },
                })
            })
            .collect();
    }
    if let Some(id) = &message.tool_call_id {
        wire["tool_call_id"] = json!(id);
    }
    wire
}

#[async_trait]
impl ChatModel for AzureOpenAiClient {
    async fn chat(&self, messages: &[ChatMessage]) -> AzragResult<String> {
        self.complete(messages).await
    }

    async fn chat_structured(
        &self,
        messages: &[ChatMessage],
        schema: &ResponseSchema,
    ) -> AzragResult<Value> {
        self.complete_structured(messages, schema).await
    }

    fn model_name(&self) -> &str {
        &self.config.chat_deployment
    }
}

#[async_trait]
impl EmbeddingModel for AzureOpenAiClient {
    async fn embed(&self, text: &str) -> AzragResult<Vec<f32>> {
        self.create_embedding(text).await
    }

    fn model_name(&self) -> &str {
        &self.config.embedding_deployment
    }
}
