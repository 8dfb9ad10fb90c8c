//! Shared HTTP plumbing for the Azure REST clients

use azrag_core::{AzragError, AzragResult, ErrorContext};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::debug;

const USER_AGENT: &str = concat!("azrag/", env!("CARGO_PKG_VERSION"));

/// How requests authenticate against a service
#[derive(Clone)]
pub enum Credential {
    /// `api-key` header
    ApiKey(String),
    /// `Authorization: Bearer` header
    Bearer(String),
}

impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Credential::ApiKey(key) => write!(f, "ApiKey({})", azrag_core::mask_secret(key)),
            Credential::Bearer(token) => {
                write!(f, "Bearer({})", azrag_core::mask_secret(token))
            }
        }
    }
}

impl Credential {
    /// Prefer a key; fall back to a bearer token
    pub fn from_parts(
        api_key: Option<&str>,
        bearer_token: Option<&str>,
        component: &str,
    ) -> AzragResult<Self> {
        match (api_key, bearer_token) {
            (Some(key), _) => Ok(Credential::ApiKey(key.to_string())),
            (None, Some(token)) => Ok(Credential::Bearer(token.to_string())),
            (None, None) => Err(azrag_core::config_error!(
                format!("{} has neither an api key nor a bearer token", component),
                component
            )),
        }
    }

    fn header(&self) -> AzragResult<(reqwest::header::HeaderName, reqwest::header::HeaderValue)> {
        let (name, value) = match self {
            Credential::ApiKey(key) => (
                reqwest::header::HeaderName::from_static("api-key"),
                key.clone(),
            ),
            Credential::Bearer(token) => (
                reqwest::header::AUTHORIZATION,
                format!("Bearer {}", token),
            ),
        };

        let mut value = reqwest::header::HeaderValue::from_str(&value).map_err(|e| {
            AzragError::Config {
                message: format!("Credential is not a valid header value: {}", e),
                source: Some(Box::new(e)),
                context: ErrorContext::new("http_client").with_operation("create_client"),
            }
        })?;
        value.set_sensitive(true);
        Ok((name, value))
    }
}

/// Connection settings common to every Azure client
#[derive(Debug, Clone)]
pub struct ServiceClientConfig {
    pub base_url: String,
    pub credential: Credential,
    pub api_version: String,
    /// `None` leaves the request unbounded
    pub timeout_seconds: Option<u64>,
}

impl ServiceClientConfig {
    /// `{base_url}/{path}?api-version={version}`
    pub fn url(&self, path: &str) -> String {
        format!(
            "{}/{}?api-version={}",
            self.base_url.trim_end_matches('/'),
            path.trim_start_matches('/'),
            self.api_version
        )
    }
}

/// Build a reqwest client carrying the credential and user agent on every request
pub(crate) fn create_http_client(config: &ServiceClientConfig) -> AzragResult<reqwest::Client> {
    let mut headers = reqwest::header::HeaderMap::new();

    headers.insert(
        reqwest::header::USER_AGENT,
        reqwest::header::HeaderValue::from_static(USER_AGENT),
    );

    let (name, value) = config.credential.header()?;
    headers.insert(name, value);

    let mut builder = reqwest::Client::builder().default_headers(headers);
    if let Some(timeout) = config.timeout_seconds {
        builder = builder.timeout(std::time::Duration::from_secs(timeout));
    }

    builder.build().map_err(|e| AzragError::Config {
        message: format!("Failed to create HTTP client: {}", e),
        source: Some(Box::new(e)),
        context: ErrorContext::new("http_client").with_operation("create_client"),
    })
}

#[derive(Debug, Deserialize)]
struct AzureErrorEnvelope {
    error: AzureErrorBody,
}

#[derive(Debug, Deserialize)]
struct AzureErrorBody {
    code: Option<String>,
    message: String,
}

/// Turn a non-success response into a `Service` error
pub(crate) async fn handle_response_error(
    response: reqwest::Response,
    component: &str,
    operation: &str,
) -> AzragError {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();

    let message = match serde_json::from_str::<AzureErrorEnvelope>(&body) {
        Ok(envelope) => match envelope.error.code {
            Some(code) => format!("{}: {}", code, envelope.error.message),
            None => envelope.error.message,
        },
        Err(_) if body.trim().is_empty() => status
            .canonical_reason()
            .unwrap_or("Unknown error")
            .to_string(),
        Err(_) => body,
    };

    AzragError::Service {
        status: status.as_u16(),
        message,
        context: ErrorContext::new(component)
            .with_operation(operation)
            .with_suggestion(match status.as_u16() {
                401 | 403 => "Check the api key or token for this resource",
                404 => "Check the deployment or index name",
                429 => "The resource is throttling requests; try again later",
                _ => "Check network connectivity and service status",
            }),
    }
}

pub(crate) fn network_error(error: reqwest::Error, component: &str, operation: &str) -> AzragError {
    AzragError::Network {
        message: format!("Request failed: {}", error),
        source: Some(Box::new(error)),
        context: ErrorContext::new(component).with_operation(operation),
    }
}

/// Send a request and return the successful response
pub(crate) async fn send(
    request: reqwest::RequestBuilder,
    component: &str,
    operation: &str,
) -> AzragResult<reqwest::Response> {
    let response = request
        .send()
        .await
        .map_err(|e| network_error(e, component, operation))?;

    debug!(
        component = component,
        operation = operation,
        status = response.status().as_u16(),
        "Received response"
    );

    if !response.status().is_success() {
        return Err(handle_response_error(response, component, operation).await);
    }

    Ok(response)
}

/// Send a request and decode its JSON body
pub(crate) async fn send_json<T: DeserializeOwned>(
    request: reqwest::RequestBuilder,
    component: &str,
    operation: &str,
) -> AzragResult<T> {
    let response = send(request, component, operation).await?;
    response.json::<T>().await.map_err(|e| AzragError::Internal {
        message: format!("Unexpected response body: {}", e),
        source: Some(Box::new(e)),
        context: ErrorContext::new(component).with_operation(operation),
    })
}
