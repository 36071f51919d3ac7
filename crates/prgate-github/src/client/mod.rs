//! HTTP client for authenticated REST API calls.
//!
//! This module provides [`GitHubClient`], a thin wrapper over `reqwest` that
//! attaches the headers every request needs (user agent, accept type, API
//! version, authorization) and turns non-success responses into [`ApiError`]s.

mod rate_limit;

use std::sync::Arc;
use std::time::Duration;

use reqwest::header::{ACCEPT, AUTHORIZATION, USER_AGENT};
use reqwest::{Method, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::auth::AuthorizationProvider;
use crate::error::{ApiError, ValidationError};
use crate::pagination::PagedSequence;

pub use rate_limit::{is_rate_limit_response, parse_rate_limit_from_headers, RateLimit};

/// Media type requested from the API unless configured otherwise.
pub const DEFAULT_ACCEPT: &str = "application/vnd.github+json";

/// REST API version pinned through the `X-GitHub-Api-Version` header.
pub const DEFAULT_API_VERSION: &str = "2022-11-28";

const API_VERSION_HEADER: &str = "X-GitHub-Api-Version";

/// Configuration for API client behavior.
///
/// # Examples
///
/// ```
/// use prgate_github::client::ClientConfig;
/// use std::time::Duration;
///
/// let config = ClientConfig::new("release-gate/1.0")
///     .with_timeout(Duration::from_secs(60));
///
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// User agent string for API requests (required by GitHub)
    pub user_agent: String,
    /// Value of the `Accept` header
    pub accept: String,
    /// Value of the `X-GitHub-Api-Version` header
    pub api_version: String,
    /// Request timeout duration
    #[serde(with = "duration_secs")]
    pub timeout: Duration,
    /// API base URL
    pub github_api_url: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            user_agent: String::new(),
            accept: DEFAULT_ACCEPT.to_string(),
            api_version: DEFAULT_API_VERSION.to_string(),
            timeout: Duration::from_secs(30),
            github_api_url: "https://api.github.com".to_string(),
        }
    }
}

impl ClientConfig {
    /// Create a configuration with the given user agent and defaults elsewhere.
    pub fn new(user_agent: impl Into<String>) -> Self {
        Self {
            user_agent: user_agent.into(),
            ..Self::default()
        }
    }

    /// Create a new builder for client configuration.
    pub fn builder() -> ClientConfigBuilder {
        ClientConfigBuilder::new()
    }

    /// Set the user agent string.
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Set the `Accept` header value.
    pub fn with_accept(mut self, accept: impl Into<String>) -> Self {
        self.accept = accept.into();
        self
    }

    /// Set the request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the API base URL.
    pub fn with_github_api_url(mut self, url: impl Into<String>) -> Self {
        self.github_api_url = url.into();
        self
    }

    /// Check that the configuration can be used to make requests.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError` if the user agent or accept type is empty,
    /// the timeout is zero, or the API URL does not parse.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.user_agent.trim().is_empty() {
            return Err(ValidationError::Required {
                field: "user_agent".to_string(),
            });
        }
        if self.accept.trim().is_empty() {
            return Err(ValidationError::Required {
                field: "accept".to_string(),
            });
        }
        if self.timeout.is_zero() {
            return Err(ValidationError::OutOfRange {
                field: "timeout".to_string(),
                message: "must be greater than zero".to_string(),
            });
        }
        url::Url::parse(&self.github_api_url).map_err(|e| ValidationError::InvalidFormat {
            field: "github_api_url".to_string(),
            message: e.to_string(),
        })?;
        Ok(())
    }
}

/// Builder for constructing `ClientConfig` instances.
#[derive(Debug, Default)]
pub struct ClientConfigBuilder {
    config: ClientConfig,
}

impl ClientConfigBuilder {
    /// Create a new configuration builder with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the user agent string.
    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.config.user_agent = user_agent.into();
        self
    }

    /// Set the `Accept` header value.
    pub fn accept(mut self, accept: impl Into<String>) -> Self {
        self.config.accept = accept.into();
        self
    }

    /// Set the `X-GitHub-Api-Version` header value.
    pub fn api_version(mut self, api_version: impl Into<String>) -> Self {
        self.config.api_version = api_version.into();
        self
    }

    /// Set the request timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.config.timeout = timeout;
        self
    }

    /// Set the API base URL.
    pub fn github_api_url(mut self, url: impl Into<String>) -> Self {
        self.config.github_api_url = url.into();
        self
    }

    /// Build and validate the final configuration.
    pub fn build(self) -> Result<ClientConfig, ValidationError> {
        self.config.validate()?;
        Ok(self.config)
    }
}

mod duration_secs {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_secs())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_secs)
    }
}

/// REST API client.
///
/// Cheap to clone; clones share the underlying connection pool. Authorization
/// is supplied per call so the same client serves both app-level and
/// installation-level requests.
#[derive(Clone)]
pub struct GitHubClient {
    http_client: reqwest::Client,
    config: Arc<ClientConfig>,
}

impl GitHubClient {
    /// Create a client from a validated configuration.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError` if the configuration is invalid or the HTTP
    /// client cannot be created.
    pub fn new(config: ClientConfig) -> Result<Self, ValidationError> {
        config.validate()?;

        let http_client = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(&config.user_agent)
            .build()
            .map_err(|e| ValidationError::InvalidFormat {
                field: "http_client".to_string(),
                message: format!("Failed to create HTTP client: {}", e),
            })?;

        Ok(Self {
            http_client,
            config: Arc::new(config),
        })
    }

    /// Get the client configuration.
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Build an absolute URL for an API path such as `repos/o/r/pulls/1/files`.
    pub fn api_url(&self, path: &str) -> String {
        let base = self.config.github_api_url.trim_end_matches('/');
        let path = path.strip_prefix('/').unwrap_or(path);
        format!("{}/{}", base, path)
    }

    /// Start a request carrying the standard headers and the given authorization.
    pub(crate) fn request(
        &self,
        method: Method,
        url: &str,
        authorization: &str,
    ) -> RequestBuilder {
        self.http_client
            .request(method, url)
            .header(USER_AGENT, &self.config.user_agent)
            .header(ACCEPT, &self.config.accept)
            .header(API_VERSION_HEADER, &self.config.api_version)
            .header(AUTHORIZATION, authorization)
    }

    /// GET a single JSON resource.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Credential` if no authorization could be produced,
    /// `ApiError::RateLimitExceeded` or `ApiError::Request` for non-success
    /// responses, and `ApiError::Decode` if the body does not match `T`.
    pub async fn get_json<T: DeserializeOwned>(
        &self,
        url: &str,
        auth: &dyn AuthorizationProvider,
    ) -> Result<T, ApiError> {
        let authorization = auth.authorization().await?;
        let response = self.request(Method::GET, url, &authorization).send().await?;
        let response = ensure_success(url, response).await?;
        decode_json(response).await
    }

    /// GET a single JSON resource that may legitimately be absent.
    ///
    /// A 404 yields `Ok(None)`; this is how optional configuration files are
    /// looked up. Every other failure is reported as in [`get_json`](Self::get_json).
    pub async fn get_optional<T: DeserializeOwned>(
        &self,
        url: &str,
        auth: &dyn AuthorizationProvider,
    ) -> Result<Option<T>, ApiError> {
        let authorization = auth.authorization().await?;
        let response = self.request(Method::GET, url, &authorization).send().await?;

        if response.status() == StatusCode::NOT_FOUND {
            debug!(url = %url, "Optional resource not found");
            return Ok(None);
        }

        let response = ensure_success(url, response).await?;
        decode_json(response).await.map(Some)
    }

    /// Iterate over a paginated collection, decoding each element as `T`.
    pub fn paged<T>(
        &self,
        url: impl Into<String>,
        auth: Arc<dyn AuthorizationProvider>,
    ) -> PagedSequence<T>
    where
        T: DeserializeOwned + Send + 'static,
    {
        PagedSequence::new(self.clone(), url, auth)
    }
}

impl std::fmt::Debug for GitHubClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GitHubClient")
            .field("config", &self.config)
            .finish()
    }
}

/// Pass a success response through, or convert a failure into an `ApiError`.
pub(crate) async fn ensure_success(url: &str, response: Response) -> Result<Response, ApiError> {
    if response.status().is_success() {
        return Ok(response);
    }
    Err(error_for_response(url, response).await)
}

/// Classify a non-success response.
///
/// A 403 or 429 whose remaining-quota header is `0` is a rate-limit failure;
/// everything else is a plain request failure.
pub(crate) async fn error_for_response(url: &str, response: Response) -> ApiError {
    let status = response.status();
    let headers = response.headers().clone();
    let message = response_message(response).await;

    if is_rate_limit_response(status, &headers) {
        let reset_at = parse_rate_limit_from_headers(&headers).map(|limit| limit.reset_at());
        warn!(url = %url, status = status.as_u16(), reset_at = ?reset_at, "Rate limit exceeded");
        return ApiError::RateLimitExceeded {
            status: status.as_u16(),
            reset_at,
            message,
        };
    }

    debug!(url = %url, status = status.as_u16(), "API request failed");
    ApiError::Request {
        status: status.as_u16(),
        url: url.to_string(),
        message,
    }
}

/// Extract the human-readable part of an error body.
///
/// GitHub error bodies look like `{"message": "...", "documentation_url": "..."}`.
pub(crate) async fn response_message(response: Response) -> String {
    #[derive(Deserialize)]
    struct ErrorBody {
        message: String,
    }

    let text = response
        .text()
        .await
        .unwrap_or_else(|_| "Unable to read error body".to_string());

    serde_json::from_str::<ErrorBody>(&text)
        .map(|body| body.message)
        .unwrap_or(text)
}

async fn decode_json<T: DeserializeOwned>(response: Response) -> Result<T, ApiError> {
    let bytes = response.bytes().await?;
    Ok(serde_json::from_slice(&bytes)?)
}

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;
