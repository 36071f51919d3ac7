//! Installation access tokens obtained by redeeming the app assertion.

use async_trait::async_trait;
use reqwest::{Method, Response};
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use super::{
    check_installation_token_lifetime, ApplicationCredential, AuthorizationProvider,
    CredentialConfig,
};
use crate::cache::ExpiringCache;
use crate::client::{response_message, GitHubClient};
use crate::error::{KeyLoadingError, ValidationError};

/// Body of `POST /app/installations/{id}/access_tokens`.
#[derive(Deserialize)]
struct TokenResponse {
    token: String,
    #[serde(default)]
    expires_at: Option<String>,
}

/// Body of `GET /repos/{owner}/{repo}/installation`, reduced to what is used.
#[derive(Deserialize)]
struct InstallationLookup {
    access_tokens_url: String,
}

/// Installation-level credential: a cached, self-renewing access token.
///
/// Each renewal POSTs to the installation's token-exchange URL authorized with
/// the current app assertion, so an expired assertion is renewed first.
pub struct InstallationCredential {
    token_exchange_url: String,
    lifetime: Duration,
    cache: ExpiringCache<String, KeyLoadingError>,
}

impl InstallationCredential {
    /// Create a credential for a known token-exchange URL using the default
    /// token lifetime.
    pub fn new(
        client: GitHubClient,
        token_exchange_url: impl Into<String>,
        app_credential: Arc<ApplicationCredential>,
    ) -> Self {
        Self::build(
            client,
            token_exchange_url.into(),
            app_credential,
            CredentialConfig::default().installation_token_lifetime,
        )
    }

    /// Create a credential with a custom cache lifetime.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError::OutOfRange` if `lifetime` is zero or exceeds
    /// 60 minutes.
    pub fn with_lifetime(
        client: GitHubClient,
        token_exchange_url: impl Into<String>,
        app_credential: Arc<ApplicationCredential>,
        lifetime: Duration,
    ) -> Result<Self, ValidationError> {
        check_installation_token_lifetime(lifetime)?;
        Ok(Self::build(
            client,
            token_exchange_url.into(),
            app_credential,
            lifetime,
        ))
    }

    /// Resolve the installation that covers `repository_url` and create a
    /// credential for it.
    ///
    /// Performs `GET {repository_url}/installation` as the App and reads
    /// `access_tokens_url` from the response.
    ///
    /// # Errors
    ///
    /// Returns `KeyLoadingError::ExchangeFailed` if the lookup is answered with
    /// a non-success status, `KeyLoadingError::MalformedResponse` if the body
    /// lacks `access_tokens_url`, and any error from signing the assertion.
    pub async fn for_repository(
        client: GitHubClient,
        repository_url: &str,
        app_credential: Arc<ApplicationCredential>,
    ) -> Result<Self, KeyLoadingError> {
        let lookup_url = format!("{}/installation", repository_url.trim_end_matches('/'));
        let authorization = app_credential.authorization().await?;

        let response = client
            .request(Method::GET, &lookup_url, &authorization)
            .send()
            .await
            .map_err(|e| KeyLoadingError::Transport {
                message: e.to_string(),
            })?;
        let response = ensure_exchange_success(&lookup_url, response).await?;

        let lookup: InstallationLookup =
            response
                .json()
                .await
                .map_err(|e| KeyLoadingError::MalformedResponse {
                    message: format!("Failed to parse installation response: {}", e),
                })?;

        debug!(
            repository_url = %repository_url,
            access_tokens_url = %lookup.access_tokens_url,
            "Resolved repository installation"
        );
        Ok(Self::new(client, lookup.access_tokens_url, app_credential))
    }

    fn build(
        client: GitHubClient,
        token_exchange_url: String,
        app_credential: Arc<ApplicationCredential>,
        lifetime: Duration,
    ) -> Self {
        let url = token_exchange_url.clone();
        let cache = ExpiringCache::new(lifetime, move || {
            let client = client.clone();
            let url = url.clone();
            let app_credential = app_credential.clone();
            async move { exchange_token(&client, &url, app_credential.as_ref()).await }
        });

        Self {
            token_exchange_url,
            lifetime,
            cache,
        }
    }

    /// URL the app assertion is redeemed at.
    pub fn token_exchange_url(&self) -> &str {
        &self.token_exchange_url
    }

    /// How long each token is cached.
    pub fn lifetime(&self) -> Duration {
        self.lifetime
    }

    /// Get the current installation token, exchanging a new one if needed.
    ///
    /// # Errors
    ///
    /// Returns `KeyLoadingError` if the app assertion cannot be produced or the
    /// exchange fails.
    pub async fn token(&self) -> Result<String, KeyLoadingError> {
        self.cache.get().await
    }

    /// Discard the cached token so the next call performs a fresh exchange.
    ///
    /// Use after the API rejects the token with 401 (e.g. it was revoked).
    pub fn invalidate(&self) {
        self.cache.invalidate();
    }
}

impl std::fmt::Debug for InstallationCredential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InstallationCredential")
            .field("token_exchange_url", &self.token_exchange_url)
            .field("lifetime", &self.lifetime)
            .finish()
    }
}

#[async_trait]
impl AuthorizationProvider for InstallationCredential {
    async fn authorization(&self) -> Result<String, KeyLoadingError> {
        Ok(format!("token {}", self.token().await?))
    }
}

/// Redeem the current app assertion for an installation token.
async fn exchange_token(
    client: &GitHubClient,
    url: &str,
    app_credential: &ApplicationCredential,
) -> Result<String, KeyLoadingError> {
    let authorization = app_credential.authorization().await?;

    let response = client
        .request(Method::POST, url, &authorization)
        .send()
        .await
        .map_err(|e| KeyLoadingError::Transport {
            message: e.to_string(),
        })?;
    let response = ensure_exchange_success(url, response).await?;

    let body: TokenResponse =
        response
            .json()
            .await
            .map_err(|e| KeyLoadingError::MalformedResponse {
                message: format!("Failed to parse token response: {}", e),
            })?;

    info!(
        token_exchange_url = %url,
        expires_at = body.expires_at.as_deref().unwrap_or("unknown"),
        "Obtained installation token"
    );
    Ok(body.token)
}

async fn ensure_exchange_success(
    url: &str,
    response: Response,
) -> Result<Response, KeyLoadingError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let message = response_message(response).await;
    warn!(url = %url, status = status.as_u16(), "Credential exchange rejected");
    Err(KeyLoadingError::ExchangeFailed {
        status: status.as_u16(),
        message,
    })
}

#[cfg(test)]
#[path = "installation_tests.rs"]
mod tests;
