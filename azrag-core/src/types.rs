//! Core data type definitions

use crate::error::AzragResult;
use serde::{Deserialize, Serialize};

/// Role of a chat turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
    Tool,
}

/// One message in an ordered chat transcript
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
    /// Calls requested by an assistant turn
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<ToolCall>,
    /// The call a `Role::Tool` message answers
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
}

impl ChatMessage {
    fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            tool_calls: Vec::new(),
            tool_call_id: None,
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::new(Role::System, content)
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }

    /// Result of running the tool behind `call_id`
    pub fn tool_result(call_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            tool_call_id: Some(call_id.into()),
            ..Self::new(Role::Tool, content)
        }
    }
}

/// Declared output schema for constrained (structured) completions
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResponseSchema {
    pub name: String,
    pub schema: serde_json::Value,
}

/// A callable tool the model may choose to invoke
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    /// JSON schema of the arguments
    pub parameters: serde_json::Value,
}

/// A tool invocation requested by the model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    pub id: String,
    pub name: String,
    /// Raw JSON arguments as produced by the model
    pub arguments: String,
}

/// Assistant turn returned from a tool-enabled completion
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ToolCompletion {
    pub content: Option<String>,
    pub tool_calls: Vec<ToolCall>,
    pub total_tokens: Option<u64>,
}

impl ToolCompletion {
    /// The assistant turn to append before the tool results
    pub fn to_message(&self) -> ChatMessage {
        ChatMessage {
            tool_calls: self.tool_calls.clone(),
            ..ChatMessage::assistant(self.content.clone().unwrap_or_default())
        }
    }
}

/// Nearest-neighbour clause of a search request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VectorQuery {
    pub vector: Vec<f32>,
    pub k_nearest_neighbors: usize,
    /// Comma-separated vector field names
    pub fields: String,
}

/// A single query against a search index
///
/// Text only, vector only, or both at once (hybrid). The provider fuses the two result
/// lists with its own ranking; nothing here re-scores.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SearchRequest {
    pub search_text: Option<String>,
    pub vector_queries: Vec<VectorQuery>,
    pub select: Vec<String>,
    pub search_fields: Vec<String>,
    pub filter: Option<String>,
    pub top: usize,
}

impl SearchRequest {
    /// Keyword-only query
    pub fn text(query: impl Into<String>, top: usize) -> Self {
        Self {
            search_text: Some(query.into()),
            top,
            ..Self::default()
        }
    }

    /// Nearest-neighbour-only query
    pub fn vector(vector: Vec<f32>, field: impl Into<String>, top: usize) -> Self {
        Self {
            vector_queries: vec![VectorQuery {
                vector,
                k_nearest_neighbors: top,
                fields: field.into(),
            }],
            top,
            ..Self::default()
        }
    }

    /// Keyword and nearest-neighbour match in one request
    pub fn hybrid(
        query: impl Into<String>,
        vector: Vec<f32>,
        field: impl Into<String>,
        top: usize,
    ) -> Self {
        Self {
            search_text: Some(query.into()),
            ..Self::vector(vector, field, top)
        }
    }

    pub fn with_select<S: AsRef<str>>(mut self, fields: &[S]) -> Self {
        self.select = fields.iter().map(|f| f.as_ref().to_string()).collect();
        self
    }

    pub fn with_search_fields<S: AsRef<str>>(mut self, fields: &[S]) -> Self {
        self.search_fields = fields.iter().map(|f| f.as_ref().to_string()).collect();
        self
    }

    pub fn with_filter(mut self, filter: impl Into<String>) -> Self {
        self.filter = Some(filter.into());
        self
    }

    pub fn is_hybrid(&self) -> bool {
        self.search_text.is_some() && !self.vector_queries.is_empty()
    }

    /// Build a request from a reusable profile
    ///
    /// Text fields switch on keyword search over those fields, vector fields switch on
    /// nearest-neighbour search over them. A profile with neither cannot be queried.
    pub fn from_profile(
        query: impl Into<String>,
        vector: Option<Vec<f32>>,
        profile: &SearchProfile,
    ) -> AzragResult<Self> {
        if profile.text_fields.is_empty() && profile.vector_fields.is_empty() {
            return Err(crate::validation_error!(
                "A search profile needs at least one text field or vector field",
                "profile",
                "search"
            ));
        }

        let search_text = if profile.text_fields.is_empty() {
            None
        } else {
            Some(query.into())
        };

        let vector_queries = match (profile.vector_fields.is_empty(), vector) {
            (true, _) => Vec::new(),
            (false, Some(vector)) => vec![VectorQuery {
                vector,
                k_nearest_neighbors: profile.k_nearest_neighbors,
                fields: profile.vector_fields.join(","),
            }],
            (false, None) => {
                return Err(crate::validation_error!(
                    "Profile has vector fields but no query vector was supplied",
                    "vector",
                    "search"
                ))
            }
        };

        Ok(Self {
            search_text,
            vector_queries,
            select: profile.select.clone(),
            search_fields: profile.text_fields.clone(),
            filter: profile.filter.clone(),
            top: profile.top,
        })
    }
}

/// Field selection and limits for a family of queries
///
/// Missing keys fall back to the defaults when read from a file.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchProfile {
    pub text_fields: Vec<String>,
    pub vector_fields: Vec<String>,
    pub select: Vec<String>,
    pub top: usize,
    pub k_nearest_neighbors: usize,
    pub filter: Option<String>,
}

impl Default for SearchProfile {
    fn default() -> Self {
        Self {
            text_fields: Vec::new(),
            vector_fields: Vec::new(),
            select: Vec::new(),
            top: crate::config::DEFAULT_TOP_K,
            k_nearest_neighbors: crate::config::DEFAULT_TOP_K,
            filter: None,
        }
    }
}

/// A scored document returned by the search provider
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    pub id: String,
    pub content: String,
    pub score: f64,
    /// Any other selected fields, untouched
    #[serde(default, skip_serializing_if = "serde_json::Map::is_empty")]
    pub fields: serde_json::Map<String, serde_json::Value>,
}

/// A context snippet as echoed back to HTTP callers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContextItem {
    pub filename: String,
    pub content: String,
}

impl From<&SearchResult> for ContextItem {
    fn from(result: &SearchResult) -> Self {
        Self {
            filename: result.id.clone(),
            content: result.content.clone(),
        }
    }
}

/// Body of a `/chat` response: the answer plus the exact context used to build it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatReply {
    pub response: String,
    pub context: Vec<ContextItem>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_serialization() {
        let msg = ChatMessage::system("be brief");
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["role"], "system");
        assert_eq!(json["content"], "be brief");
    }

    #[test]
    fn test_tool_turns() {
        let completion = ToolCompletion {
            content: None,
            tool_calls: vec![ToolCall {
                id: "call_1".to_string(),
                name: "get_delivery_date".to_string(),
                arguments: r#"{"order_id":"12345"}"#.to_string(),
            }],
            total_tokens: None,
        };

        let assistant = completion.to_message();
        assert_eq!(assistant.role, Role::Assistant);
        assert_eq!(assistant.tool_calls, completion.tool_calls);

        let result = ChatMessage::tool_result("call_1", "Friday");
        assert_eq!(result.role, Role::Tool);
        assert_eq!(result.tool_call_id.as_deref(), Some("call_1"));

        // Plain turns carry no tool keys
        let json = serde_json::to_value(ChatMessage::user("hi")).unwrap();
        assert!(json.get("tool_calls").is_none());
        assert!(json.get("tool_call_id").is_none());
    }

    #[test]
    fn test_hybrid_request_builder() {
        let request = SearchRequest::hybrid("plan cost", vec![0.1, 0.2], "contentVector", 3)
            .with_select(&["id", "content"]);
        assert!(request.is_hybrid());
        assert_eq!(request.top, 3);
        assert_eq!(request.vector_queries[0].k_nearest_neighbors, 3);
        assert_eq!(request.select, vec!["id", "content"]);

        assert!(!SearchRequest::text("plan cost", 3).is_hybrid());
    }

    #[test]
    fn test_request_from_profile() {
        let profile = SearchProfile {
            text_fields: vec!["content".to_string(), "title".to_string()],
            vector_fields: vec!["contentVector".to_string()],
            select: vec!["id".to_string(), "content".to_string()],
            top: 5,
            k_nearest_neighbors: 10,
            filter: Some("category eq 'benefits'".to_string()),
        };

        let request = SearchRequest::from_profile("dental", Some(vec![0.5; 4]), &profile).unwrap();
        assert!(request.is_hybrid());
        assert_eq!(request.search_fields, vec!["content", "title"]);
        assert_eq!(request.vector_queries[0].k_nearest_neighbors, 10);
        assert_eq!(request.top, 5);
        assert_eq!(request.filter.as_deref(), Some("category eq 'benefits'"));

        let text_only = SearchProfile {
            vector_fields: Vec::new(),
            ..profile.clone()
        };
        let request = SearchRequest::from_profile("dental", None, &text_only).unwrap();
        assert!(request.vector_queries.is_empty());

        assert!(SearchRequest::from_profile("dental", None, &profile).is_err());
        assert!(SearchRequest::from_profile("dental", None, &SearchProfile::default()).is_err());
    }

    #[test]
    fn test_chat_reply_wire_shape() {
        let reply: ChatReply = serde_json::from_str(
            r#"{"response":"$100","context":[{"filename":"benefits.pdf","content":"Your plan costs $100."}]}"#,
        )
        .unwrap();
        assert_eq!(reply.context.len(), 1);
        assert_eq!(reply.context[0].filename, "benefits.pdf");
    }
}
