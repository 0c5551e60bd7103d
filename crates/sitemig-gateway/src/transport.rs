//! Transport seam
//!
//! [`Transport`] sends one request and returns the decoded JSON body. The
//! gateway layers retry, envelope decoding and caching on top, so fakes and
//! mocks only need to speak JSON.

use crate::error::TransportError;
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;

/// HTTP method subset used by the remote API
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    /// Read
    Get,
    /// Create
    Post,
    /// Partial update
    Patch,
}

impl Method {
    /// Whether the request changes remote state
    #[inline]
    #[must_use]
    pub fn is_mutation(self) -> bool {
        !matches!(self, Self::Get)
    }
}

/// One API request, path relative to the API base URL
#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
    /// HTTP method
    pub method: Method,
    /// Path starting with `/`
    pub path: String,
    /// Query parameters
    pub query: Vec<(String, String)>,
    /// JSON body
    pub body: Option<Value>,
}

impl ApiRequest {
    /// GET request
    #[must_use]
    pub fn get(path: impl Into<String>) -> Self {
        Self {
            method: Method::Get,
            path: path.into(),
            query: Vec::new(),
            body: None,
        }
    }

    /// POST request with JSON body
    #[must_use]
    pub fn post(path: impl Into<String>, body: Value) -> Self {
        Self {
            method: Method::Post,
            path: path.into(),
            query: Vec::new(),
            body: Some(body),
        }
    }

    /// PATCH request with JSON body
    #[must_use]
    pub fn patch(path: impl Into<String>, body: Value) -> Self {
        Self {
            method: Method::Patch,
            path: path.into(),
            query: Vec::new(),
            body: Some(body),
        }
    }

    /// Add query parameter
    #[must_use]
    pub fn with_query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }
}

/// Sends requests to the remote platform
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait Transport: Send + Sync {
    /// Send `request` and return the response body as JSON
    async fn send(&self, request: ApiRequest) -> Result<Value, TransportError>;
}

/// Connection settings for [`HttpTransport`]
#[derive(Debug, Clone, Deserialize)]
pub struct HttpConfig {
    /// API base URL, e.g. `https://api.example.com/v1`
    pub base_url: String,
    /// Bearer token
    #[serde(default)]
    pub token: Option<String>,
    /// Per-call timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_timeout_secs() -> u64 {
    30
}

/// `reqwest`-backed transport
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
    base_url: String,
    token: Option<String>,
}

impl HttpTransport {
    /// Build client from config
    ///
    /// # Errors
    /// Returns [`TransportError::Fatal`] if the client cannot be built
    pub fn new(config: &HttpConfig) -> Result<Self, TransportError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| TransportError::Fatal(format!("failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            token: config.token.clone(),
        })
    }
}

#[async_trait::async_trait]
impl Transport for HttpTransport {
    async fn send(&self, request: ApiRequest) -> Result<Value, TransportError> {
        let method = match request.method {
            Method::Get => reqwest::Method::GET,
            Method::Post => reqwest::Method::POST,
            Method::Patch => reqwest::Method::PATCH,
        };
        let url = format!("{}{}", self.base_url, request.path);

        let mut builder = self.client.request(method, &url).query(&request.query);
        if let Some(token) = &self.token {
            builder = builder.bearer_auth(token);
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder.send().await.map_err(classify)?;
        let status = response.status();
        let text = response.text().await.map_err(classify)?;

        // Error statuses still carry an envelope; let the gateway read it.
        // An empty body decodes to `null`, which the envelope rejects.
        if text.trim().is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_str(&text)
            .map_err(|e| TransportError::Fatal(format!("HTTP {status} with non-JSON body: {e}")))
    }
}

fn classify(error: reqwest::Error) -> TransportError {
    if error.is_connect() || error.is_timeout() {
        TransportError::Transient(error.to_string())
    } else {
        TransportError::Fatal(error.to_string())
    }
}
