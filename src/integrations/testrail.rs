//! TestRail REST API dispatcher.
//!
//! Owns the authenticated HTTP client and the single generic request path
//! that every tool funnels through. Identifiers are interpolated by the
//! caller; this layer only composes the URL, attaches the payload, and
//! translates the response.

use std::fmt;
use std::str::FromStr;

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::core::Config;

/// Versioned API suffix appended to the instance URL.
pub const API_PREFIX: &str = "index.php?/api/v2/";

/// HTTP methods the TestRail API accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Delete,
}

impl HttpMethod {
    /// Canonical upper-case name.
    pub fn as_str(self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Delete => "DELETE",
        }
    }

    /// Whether requests with this method carry a JSON body.
    pub fn has_body(self) -> bool {
        matches!(self, HttpMethod::Post | HttpMethod::Put)
    }

    fn to_reqwest(self) -> reqwest::Method {
        match self {
            HttpMethod::Get => reqwest::Method::GET,
            HttpMethod::Post => reqwest::Method::POST,
            HttpMethod::Put => reqwest::Method::PUT,
            HttpMethod::Delete => reqwest::Method::DELETE,
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HttpMethod {
    type Err = TestRailError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "GET" => Ok(HttpMethod::Get),
            "POST" => Ok(HttpMethod::Post),
            "PUT" => Ok(HttpMethod::Put),
            "DELETE" => Ok(HttpMethod::Delete),
            _ => Err(TestRailError::InvalidArgument(format!("Unsupported HTTP method: {}", s))),
        }
    }
}

/// Error detail returned by TestRail for a failed call.
#[derive(Debug, Clone, PartialEq)]
pub enum ApiErrorDetail {
    /// Body parsed as JSON (TestRail normally sends `{"error": "..."}`)
    Json(Value),
    /// Raw body text when it was not JSON
    Text(String),
}

impl ApiErrorDetail {
    fn from_body(body: String) -> Self {
        match serde_json::from_str(&body) {
            Ok(value) => ApiErrorDetail::Json(value),
            Err(_) => ApiErrorDetail::Text(body),
        }
    }
}

impl fmt::Display for ApiErrorDetail {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiErrorDetail::Json(value) => write!(f, "{}", value),
            ApiErrorDetail::Text(text) => f.write_str(text),
        }
    }
}

/// Result type for TestRail operations.
pub type TestRailResult<T> = Result<T, TestRailError>;

/// Error types for TestRail operations.
#[derive(Debug, thiserror::Error)]
pub enum TestRailError {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("TestRail API returned HTTP {status}: {detail}")]
    RemoteApi { status: u16, detail: ApiErrorDetail },

    #[error("HTTP request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("TestRail returned HTTP {status} with a non-JSON body: {source}")]
    InvalidResponse {
        status: u16,
        #[source]
        source: serde_json::Error,
    },
}

impl TestRailError {
    /// HTTP status reported by TestRail, if the call got that far.
    pub fn status(&self) -> Option<u16> {
        match self {
            TestRailError::RemoteApi { status, .. } | TestRailError::InvalidResponse { status, .. } => {
                Some(*status)
            }
            TestRailError::Transport(e) => e.status().map(|s| s.as_u16()),
            TestRailError::InvalidArgument(_) => None,
        }
    }
}

/// Generic request execution against the TestRail API.
///
/// The registry only depends on this trait, so tool behavior can be checked
/// without a live instance.
#[async_trait]
pub trait ApiDispatch: Send + Sync {
    /// Issue one request and return the parsed JSON response.
    async fn send_request(
        &self,
        method: HttpMethod,
        uri: &str,
        data: Option<&Map<String, Value>>,
    ) -> TestRailResult<Value>;
}

/// Compose the API prefix for an instance URL.
///
/// Trailing separators collapse to exactly one before the versioned suffix.
pub fn compose_api_prefix(base_url: &str) -> String {
    format!("{}/{}", base_url.trim_end_matches('/'), API_PREFIX)
}

/// Basic auth token for a username/API key pair.
pub fn basic_auth_token(username: &str, api_key: &str) -> String {
    STANDARD.encode(format!("{}:{}", username, api_key))
}

/// TestRail API client.
#[derive(Clone)]
pub struct TestRailClient {
    /// Composed `<instance>/index.php?/api/v2/` prefix
    base_url: String,
    /// Account the token was derived for
    username: String,
    /// HTTP client with auth and content-type installed as default headers
    client: reqwest::Client,
}

impl TestRailClient {
    /// Create a client for the configured instance.
    pub fn new(config: &Config) -> TestRailResult<Self> {
        let token = basic_auth_token(&config.username, &config.api_key);

        let mut auth = HeaderValue::from_str(&format!("Basic {}", token)).map_err(|e| {
            TestRailError::InvalidArgument(format!("Invalid authorization header: {}", e))
        })?;
        auth.set_sensitive(true);

        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, auth);
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .user_agent(concat!("testrail-mcp/", env!("CARGO_PKG_VERSION")))
            .build()?;

        let base_url = compose_api_prefix(&config.url);
        tracing::debug!(base_url = %base_url, username = %config.username, "TestRail client ready");

        Ok(Self { base_url, username: config.username.clone(), client })
    }

    /// The composed API prefix every request is sent under.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Full URL for a relative API path.
    pub fn url_for(&self, uri: &str) -> String {
        format!("{}{}", self.base_url, uri)
    }

    /// Send a request with a method given by name.
    ///
    /// Unknown method names fail with [`TestRailError::InvalidArgument`]
    /// before anything touches the network.
    pub async fn request(
        &self,
        method: &str,
        uri: &str,
        data: Option<&Map<String, Value>>,
    ) -> TestRailResult<Value> {
        let method: HttpMethod = method.parse()?;
        self.send_request(method, uri, data).await
    }
}

impl fmt::Debug for TestRailClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TestRailClient")
            .field("base_url", &self.base_url)
            .field("username", &self.username)
            .finish()
    }
}

#[async_trait]
impl ApiDispatch for TestRailClient {
    async fn send_request(
        &self,
        method: HttpMethod,
        uri: &str,
        data: Option<&Map<String, Value>>,
    ) -> TestRailResult<Value> {
        let url = self.url_for(uri);
        tracing::debug!(%method, uri, "TestRail request");

        let mut request = self.client.request(method.to_reqwest(), &url);

        // Empty payloads go out without a body, like an unset one.
        if method.has_body() {
            if let Some(data) = data.filter(|d| !d.is_empty()) {
                request = request.json(data);
            }
        }

        let response = request.send().await?;
        let status = response.status().as_u16();
        let body = response.text().await?;

        if status >= 300 {
            let detail = ApiErrorDetail::from_body(body);
            tracing::warn!(%method, uri, status, %detail, "TestRail request failed");
            return Err(TestRailError::RemoteApi { status, detail });
        }

        if body.trim().is_empty() {
            return Ok(Value::Object(Map::new()));
        }

        serde_json::from_str(&body).map_err(|source| TestRailError::InvalidResponse { status, source })
    }
}
