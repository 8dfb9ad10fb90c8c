//! Configuration management
//!
//! Values come from the process environment (optionally seeded from a `.env` file) using the
//! established Azure variable names, or from a TOML file.

use crate::error::{AzragError, AzragResult, ErrorContext};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::str::FromStr;

pub const DEFAULT_OPENAI_API_VERSION: &str = "2024-05-01-preview";
pub const DEFAULT_SEARCH_API_VERSION: &str = "2024-07-01";
pub const DEFAULT_EMBEDDING_DEPLOYMENT: &str = "text-embedding-ada-002";
pub const DEFAULT_VECTOR_FIELD: &str = "contentVector";
pub const DEFAULT_TOP_K: usize = 3;
pub const DEFAULT_CHAT_API_URL: &str = "http://localhost:5000/chat";

/// Complete application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub openai: OpenAiConfig,
    pub search: SearchConfig,
    #[serde(default)]
    pub rag: RagSettings,
    #[serde(default)]
    pub evaluation: EvaluationSettings,
}

/// Azure OpenAI connection settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenAiConfig {
    pub endpoint: String,
    /// Sent as the `api-key` header
    pub api_key: Option<String>,
    /// Sent as `Authorization: Bearer` when no key is configured
    pub bearer_token: Option<String>,
    /// Chat deployment name
    pub chat_deployment: String,
    pub embedding_deployment: String,
    pub api_version: String,
    pub temperature: f32,
    pub max_tokens: Option<u32>,
    /// No ceiling unless set
    pub timeout_seconds: Option<u64>,
}

/// Azure AI Search connection settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    pub endpoint: String,
    pub api_key: Option<String>,
    pub bearer_token: Option<String>,
    pub index: String,
    pub api_version: String,
    pub key_field: String,
    pub content_field: String,
    pub vector_field: String,
    pub vector_dimensions: usize,
    pub timeout_seconds: Option<u64>,
}

/// What retrieval does when the query embedding cannot be produced
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmbeddingFailurePolicy {
    /// Return no context and let the request continue
    #[default]
    SkipRetrieval,
    /// Abort the request like every other remote failure
    Propagate,
}

impl FromStr for EmbeddingFailurePolicy {
    type Err = AzragError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "skip" | "skip_retrieval" => Ok(Self::SkipRetrieval),
            "fail" | "propagate" => Ok(Self::Propagate),
            other => Err(crate::config_error!(
                format!("Unknown embedding failure policy '{}' (expected skip or fail)", other),
                "config"
            )),
        }
    }
}

/// Retrieval-augmented generation settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RagSettings {
    /// Number of documents to retrieve
    pub top_k: usize,
    pub embedding_failure: EmbeddingFailurePolicy,
}

impl Default for RagSettings {
    fn default() -> Self {
        Self {
            top_k: DEFAULT_TOP_K,
            embedding_failure: EmbeddingFailurePolicy::default(),
        }
    }
}

/// Evaluation harness settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvaluationSettings {
    pub api_url: String,
    pub questions_path: String,
    pub structured_output: bool,
}

impl Default for EvaluationSettings {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_CHAT_API_URL.to_string(),
            questions_path: "tests.json".to_string(),
            structured_output: false,
        }
    }
}

impl AppConfig {
    /// Load `.env` (if present) and read configuration from the environment
    pub fn from_env() -> AzragResult<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> AzragResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let require = |key: &str| {
            get(key).ok_or_else(|| AzragError::Config {
                message: format!("Required environment variable {} is not set", key),
                source: None,
                context: ErrorContext::new("config")
                    .with_operation("from_env")
                    .with_metadata("variable", key)
                    .with_suggestion("Add the variable to your environment or .env file"),
            })
        };
        let parse_num = |key: &str| -> AzragResult<Option<u64>> {
            get(key)
                .map(|v| {
                    v.parse::<u64>().map_err(|e| AzragError::Config {
                        message: format!("{} must be a positive integer: {}", key, e),
                        source: Some(Box::new(e)),
                        context: ErrorContext::new("config").with_operation("from_env"),
                    })
                })
                .transpose()
        };

        let openai_key = get("AOAI_KEY");
        let openai_token = get("AOAI_BEARER_TOKEN");
        if openai_key.is_none() && openai_token.is_none() {
            return Err(crate::config_error!(
                "Required environment variable AOAI_KEY is not set",
                "config"
            ));
        }

        let search_key = get("AZURE_SEARCH_KEY");
        let search_token = get("AZURE_SEARCH_BEARER_TOKEN");
        if search_key.is_none() && search_token.is_none() {
            return Err(crate::config_error!(
                "Required environment variable AZURE_SEARCH_KEY is not set",
                "config"
            ));
        }

        let openai = OpenAiConfig {
            endpoint: require("AOAI_ENDPOINT")?,
            api_key: openai_key,
            bearer_token: openai_token,
            chat_deployment: require("AOAI_DEPLOYMENT")?,
            embedding_deployment: get("AOAI_EMBEDDING_DEPLOYMENT")
                .unwrap_or_else(|| DEFAULT_EMBEDDING_DEPLOYMENT.to_string()),
            api_version: get("AOAI_API_VERSION")
                .unwrap_or_else(|| DEFAULT_OPENAI_API_VERSION.to_string()),
            temperature: 0.0,
            max_tokens: narrow("AOAI_MAX_TOKENS", parse_num("AOAI_MAX_TOKENS")?)?,
            timeout_seconds: parse_num("AOAI_TIMEOUT_SECONDS")?,
        };

        let search = SearchConfig {
            endpoint: require("AZURE_SEARCH_ENDPOINT")?,
            api_key: search_key,
            bearer_token: search_token,
            index: require("AZURE_SEARCH_INDEX")?,
            api_version: get("AZURE_SEARCH_API_VERSION")
                .unwrap_or_else(|| DEFAULT_SEARCH_API_VERSION.to_string()),
            key_field: get("AZURE_SEARCH_KEY_FIELD").unwrap_or_else(|| "id".to_string()),
            content_field: get("AZURE_SEARCH_CONTENT_FIELD")
                .unwrap_or_else(|| "content".to_string()),
            vector_field: get("AZURE_SEARCH_VECTOR_FIELD")
                .unwrap_or_else(|| DEFAULT_VECTOR_FIELD.to_string()),
            vector_dimensions: narrow(
                "AZURE_SEARCH_VECTOR_DIMENSIONS",
                parse_num("AZURE_SEARCH_VECTOR_DIMENSIONS")?,
            )?
            .unwrap_or(1536),
            timeout_seconds: parse_num("AZURE_SEARCH_TIMEOUT_SECONDS")?,
        };

        let rag = RagSettings {
            top_k: narrow("AZRAG_TOP_K", parse_num("AZRAG_TOP_K")?)?.unwrap_or(DEFAULT_TOP_K),
            embedding_failure: match get("AZRAG_EMBEDDING_FAILURE") {
                Some(v) => v.parse()?,
                None => EmbeddingFailurePolicy::default(),
            },
        };

        let defaults = EvaluationSettings::default();
        let evaluation = EvaluationSettings {
            api_url: get("AZRAG_CHAT_API_URL").unwrap_or(defaults.api_url),
            questions_path: get("AZRAG_EVAL_QUESTIONS").unwrap_or(defaults.questions_path),
            structured_output: get("AZRAG_EVAL_STRUCTURED")
                .map(|v| matches!(v.to_lowercase().as_str(), "1" | "true" | "yes"))
                .unwrap_or(false),
        };

        let config = Self {
            openai,
            search,
            rag,
            evaluation,
        };
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> AzragResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| AzragError::Config {
            message: format!("Failed to read config file: {}", e),
            source: Some(Box::new(e)),
            context: ErrorContext::new("config")
                .with_operation("read_file")
                .with_suggestion("Check if the config file exists and is readable"),
        })?;

        let config: AppConfig = toml::from_str(&content).map_err(|e| AzragError::Config {
            message: format!("Failed to parse config: {}", e),
            source: Some(Box::new(e)),
            context: ErrorContext::new("config")
                .with_operation("parse_toml")
                .with_suggestion("Check TOML syntax in config file"),
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Save configuration to a TOML file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> AzragResult<()> {
        let content = toml::to_string_pretty(self).map_err(|e| AzragError::Config {
            message: format!("Failed to serialize config: {}", e),
            source: Some(Box::new(e)),
            context: ErrorContext::new("config").with_operation("serialize_toml"),
        })?;

        std::fs::write(path, content).map_err(|e| AzragError::Config {
            message: format!("Failed to write config file: {}", e),
            source: Some(Box::new(e)),
            context: ErrorContext::new("config")
                .with_operation("write_file")
                .with_suggestion("Check if the directory exists and is writable"),
        })?;

        Ok(())
    }

    /// Validate configuration
    pub fn validate(&self) -> AzragResult<()> {
        validate_endpoint("openai.endpoint", &self.openai.endpoint)?;
        validate_endpoint("search.endpoint", &self.search.endpoint)?;

        if self.openai.chat_deployment.trim().is_empty() {
            return Err(crate::config_error!(
                "openai.chat_deployment must not be empty",
                "config"
            ));
        }
        if self.openai.api_key.is_none() && self.openai.bearer_token.is_none() {
            return Err(crate::config_error!(
                "openai needs either api_key or bearer_token",
                "config"
            ));
        }
        if self.search.api_key.is_none() && self.search.bearer_token.is_none() {
            return Err(crate::config_error!(
                "search needs either api_key or bearer_token",
                "config"
            ));
        }
        if self.search.index.trim().is_empty() {
            return Err(crate::config_error!("search.index must not be empty", "config"));
        }
        if self.rag.top_k == 0 {
            return Err(crate::config_error!(
                "rag.top_k must be greater than 0",
                "config"
            ));
        }
        if self.search.vector_dimensions == 0 {
            return Err(crate::config_error!(
                "search.vector_dimensions must be greater than 0",
                "config"
            ));
        }

        Ok(())
    }

    /// Copy with every secret replaced by its masked form, for display
    pub fn redacted(&self) -> Self {
        let mut config = self.clone();
        config.openai.api_key = config.openai.api_key.as_deref().map(mask_secret);
        config.openai.bearer_token = config.openai.bearer_token.as_deref().map(mask_secret);
        config.search.api_key = config.search.api_key.as_deref().map(mask_secret);
        config.search.bearer_token = config.search.bearer_token.as_deref().map(mask_secret);
        config
    }

    /// Placeholder configuration with every default filled in, for `config --init`
    pub fn template() -> Self {
        Self {
            openai: OpenAiConfig {
                endpoint: "https://your-resource.openai.azure.com".to_string(),
                api_key: Some("your-aoai-key".to_string()),
                bearer_token: None,
                chat_deployment: "gpt-4o".to_string(),
                embedding_deployment: DEFAULT_EMBEDDING_DEPLOYMENT.to_string(),
                api_version: DEFAULT_OPENAI_API_VERSION.to_string(),
                temperature: 0.0,
                max_tokens: None,
                timeout_seconds: None,
            },
            search: SearchConfig {
                endpoint: "https://your-service.search.windows.net".to_string(),
                api_key: Some("your-search-key".to_string()),
                bearer_token: None,
                index: "your-index".to_string(),
                api_version: DEFAULT_SEARCH_API_VERSION.to_string(),
                key_field: "id".to_string(),
                content_field: "content".to_string(),
                vector_field: DEFAULT_VECTOR_FIELD.to_string(),
                vector_dimensions: 1536,
                timeout_seconds: None,
            },
            rag: RagSettings::default(),
            evaluation: EvaluationSettings::default(),
        }
    }
}

/// Fit a parsed integer setting into its field type
fn narrow<T: TryFrom<u64>>(key: &str, value: Option<u64>) -> AzragResult<Option<T>> {
    value
        .map(|v| {
            T::try_from(v).map_err(|_| {
                crate::config_error!(format!("{} is out of range: {}", key, v), "config")
            })
        })
        .transpose()
}

fn validate_endpoint(field: &str, value: &str) -> AzragResult<()> {
    let parsed = url::Url::parse(value).map_err(|e| AzragError::Config {
        message: format!("{} is not a valid URL ({}): {}", field, value, e),
        source: Some(Box::new(e)),
        context: ErrorContext::new("config")
            .with_operation("validate")
            .with_suggestion("Use the full https://<resource>.<domain> endpoint"),
    })?;

    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(crate::config_error!(
            format!("{} must use http or https", field),
            "config"
        ));
    }
    Ok(())
}

/// Keep the first five characters of a secret and star out the rest
pub fn mask_secret(secret: &str) -> String {
    let visible: String = secret.chars().take(5).collect();
    let hidden = secret.chars().count().saturating_sub(5);
    format!("{}{}", visible, "*".repeat(hidden))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn base_env() -> HashMap<&'static str, &'static str> {
        HashMap::from([
            ("AOAI_ENDPOINT", "https://contoso.openai.azure.com"),
            ("AOAI_KEY", "aoai-secret-key"),
            ("AOAI_DEPLOYMENT", "gpt-4o"),
            ("AZURE_SEARCH_ENDPOINT", "https://contoso.search.windows.net"),
            ("AZURE_SEARCH_KEY", "search-secret"),
            ("AZURE_SEARCH_INDEX", "handbook"),
        ])
    }

    fn load(env: &HashMap<&'static str, &'static str>) -> AzragResult<AppConfig> {
        AppConfig::from_lookup(|k| env.get(k).map(|v| v.to_string()))
    }

    #[test]
    fn test_template_is_valid() {
        let template = AppConfig::template();
        template.validate().unwrap();
        assert_eq!(template.search.vector_field, DEFAULT_VECTOR_FIELD);
        assert_eq!(template.rag.top_k, DEFAULT_TOP_K);
    }

    #[test]
    fn test_defaults_applied() {
        let config = load(&base_env()).unwrap();
        assert_eq!(config.openai.api_version, DEFAULT_OPENAI_API_VERSION);
        assert_eq!(config.openai.embedding_deployment, DEFAULT_EMBEDDING_DEPLOYMENT);
        assert_eq!(config.openai.temperature, 0.0);
        assert_eq!(config.search.vector_field, "contentVector");
        assert_eq!(config.rag.top_k, 3);
        assert_eq!(
            config.rag.embedding_failure,
            EmbeddingFailurePolicy::SkipRetrieval
        );
        assert_eq!(config.evaluation.api_url, DEFAULT_CHAT_API_URL);
    }

    #[test]
    fn test_missing_required_value_fails_fast() {
        let mut env = base_env();
        env.remove("AZURE_SEARCH_INDEX");
        let err = load(&env).unwrap_err();
        assert!(matches!(err, AzragError::Config { .. }));
        assert!(err.to_string().contains("AZURE_SEARCH_INDEX"));
    }

    #[test]
    fn test_blank_value_counts_as_missing() {
        let mut env = base_env();
        env.insert("AOAI_DEPLOYMENT", "   ");
        assert!(load(&env).is_err());
    }

    #[test]
    fn test_bearer_token_replaces_key() {
        let mut env = base_env();
        env.remove("AOAI_KEY");
        assert!(load(&env).is_err());

        env.insert("AOAI_BEARER_TOKEN", "eyJ0eXAi");
        let config = load(&env).unwrap();
        assert!(config.openai.api_key.is_none());
        assert_eq!(config.openai.bearer_token.as_deref(), Some("eyJ0eXAi"));
    }

    #[test]
    fn test_embedding_failure_policy_parsing() {
        let mut env = base_env();
        env.insert("AZRAG_EMBEDDING_FAILURE", "fail");
        let config = load(&env).unwrap();
        assert_eq!(config.rag.embedding_failure, EmbeddingFailurePolicy::Propagate);

        env.insert("AZRAG_EMBEDDING_FAILURE", "sometimes");
        assert!(load(&env).is_err());
    }

    #[test]
    fn test_invalid_endpoint_rejected() {
        let mut env = base_env();
        env.insert("AOAI_ENDPOINT", "contoso.openai.azure.com");
        assert!(load(&env).is_err());
    }

    #[test]
    fn test_zero_top_k_rejected() {
        let mut env = base_env();
        env.insert("AZRAG_TOP_K", "0");
        assert!(load(&env).is_err());
    }

    #[test]
    fn test_out_of_range_numbers_rejected() {
        let mut env = base_env();
        env.insert("AOAI_MAX_TOKENS", "4294967296");
        match load(&env).unwrap_err() {
            AzragError::Config { message, .. } => {
                assert!(message.contains("AOAI_MAX_TOKENS"));
            }
            other => panic!("Expected Config error, got {:?}", other),
        }

        env.insert("AOAI_MAX_TOKENS", "4096");
        assert_eq!(load(&env).unwrap().openai.max_tokens, Some(4096));
    }

    #[test]
    fn test_mask_secret() {
        assert_eq!(mask_secret("abcdefgh"), "abcde***");
        assert_eq!(mask_secret("abc"), "abc");

        let config = load(&base_env()).unwrap().redacted();
        assert_eq!(config.openai.api_key.as_deref(), Some("aoai-**********"));
    }

    #[test]
    fn test_toml_round_trip() {
        let config = load(&base_env()).unwrap();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("azrag.toml");

        config.save_to_file(&path).unwrap();
        let loaded = AppConfig::from_file(&path).unwrap();
        assert_eq!(loaded.search.index, "handbook");
        assert_eq!(loaded.openai.chat_deployment, "gpt-4o");
    }
}
