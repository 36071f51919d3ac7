//! App assertion (JWT) generation for GitHub App authentication.
//!
//! # GitHub Requirements
//!
//! - JWTs must use RS256 algorithm (RSA Signature with SHA-256)
//! - Maximum expiration time is 10 minutes from issuance
//! - Claims must include `iss` (app ID), `iat` (issued at), and `exp` (expiration)

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use rsa::pkcs1::DecodeRsaPrivateKey;
use rsa::pkcs8::DecodePrivateKey;
use rsa::RsaPrivateKey;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use super::{
    check_assertion_lifetime, AppId, AuthorizationProvider, CredentialConfig, PrivateKeySource,
    ASSERTION_RENEWAL_MARGIN,
};
use crate::cache::ExpiringCache;
use crate::error::{KeyLoadingError, ValidationError};

/// JWT claims for GitHub App authentication.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssertionClaims {
    /// Issuer (GitHub App ID)
    pub iss: String,
    /// Issued at (Unix timestamp)
    pub iat: i64,
    /// Expiration (Unix timestamp)
    pub exp: i64,
}

impl AssertionClaims {
    /// Build claims issued at `issued_at` and valid for `lifetime`.
    pub fn new(app_id: &AppId, issued_at: DateTime<Utc>, lifetime: Duration) -> Self {
        let iat = issued_at.timestamp();
        Self {
            iss: app_id.as_str().to_string(),
            iat,
            exp: iat + lifetime.as_secs() as i64,
        }
    }
}

/// Application-level credential: a cached, self-renewing signed assertion.
///
/// Each assertion is handed out until one [`ASSERTION_RENEWAL_MARGIN`] before
/// its `exp`, then replaced. The private key is fetched from its source and
/// parsed again on every renewal, never kept between renewals, so key
/// rotation takes effect at the next renewal.
///
/// # Examples
///
/// ```no_run
/// use prgate_github::auth::{AppId, ApplicationCredential, FilePrivateKey};
/// use std::sync::Arc;
///
/// let credential = ApplicationCredential::new(
///     AppId::new("123456").unwrap(),
///     Arc::new(FilePrivateKey::new("/etc/prgate/app.pem")),
/// );
/// ```
pub struct ApplicationCredential {
    app_id: AppId,
    lifetime: Duration,
    cache: ExpiringCache<String, KeyLoadingError>,
}

impl ApplicationCredential {
    /// Create a credential using the default assertion lifetime.
    pub fn new(app_id: AppId, key_source: Arc<dyn PrivateKeySource>) -> Self {
        Self::build(
            app_id,
            key_source,
            CredentialConfig::default().assertion_lifetime,
        )
    }

    /// Create a credential with a custom assertion lifetime.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError::OutOfRange` if `lifetime` is shorter than
    /// 2 minutes or exceeds 10 minutes.
    pub fn with_lifetime(
        app_id: AppId,
        key_source: Arc<dyn PrivateKeySource>,
        lifetime: Duration,
    ) -> Result<Self, ValidationError> {
        check_assertion_lifetime(lifetime)?;
        Ok(Self::build(app_id, key_source, lifetime))
    }

    fn build(app_id: AppId, key_source: Arc<dyn PrivateKeySource>, lifetime: Duration) -> Self {
        // `exp` is truncated to whole seconds and fixed before signing, so the
        // cache must give the assertion up well before it.
        let renew_after = lifetime.saturating_sub(ASSERTION_RENEWAL_MARGIN);
        let signer_app_id = app_id.clone();
        let cache = ExpiringCache::new(renew_after, move || {
            let key_source = key_source.clone();
            let app_id = signer_app_id.clone();
            async move { sign_assertion(key_source.as_ref(), &app_id, lifetime).await }
        });

        Self {
            app_id,
            lifetime,
            cache,
        }
    }

    /// The App this credential represents.
    pub fn app_id(&self) -> &AppId {
        &self.app_id
    }

    /// How long each assertion is valid.
    pub fn lifetime(&self) -> Duration {
        self.lifetime
    }

    /// Get the current compact assertion, signing a new one if needed.
    ///
    /// # Errors
    ///
    /// Returns `KeyLoadingError` if the key cannot be read or parsed, or
    /// signing fails.
    pub async fn assertion(&self) -> Result<String, KeyLoadingError> {
        self.cache.get().await
    }
}

impl std::fmt::Debug for ApplicationCredential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApplicationCredential")
            .field("app_id", &self.app_id)
            .field("lifetime", &self.lifetime)
            .finish()
    }
}

#[async_trait]
impl AuthorizationProvider for ApplicationCredential {
    async fn authorization(&self) -> Result<String, KeyLoadingError> {
        Ok(format!("Bearer {}", self.assertion().await?))
    }
}

/// Read the key, parse it and sign a fresh assertion.
async fn sign_assertion(
    key_source: &dyn PrivateKeySource,
    app_id: &AppId,
    lifetime: Duration,
) -> Result<String, KeyLoadingError> {
    let pem = key_source.private_key_pem().await?;
    let encoding_key = parse_signing_key(&pem).inspect_err(|e| {
        warn!(app_id = %app_id, error = %e, "Private key rejected");
    })?;

    let claims = AssertionClaims::new(app_id, Utc::now(), lifetime);
    let token = encode(&Header::new(Algorithm::RS256), &claims, &encoding_key).map_err(|e| {
        KeyLoadingError::Signing {
            message: format!("Failed to encode JWT: {}", e),
        }
    })?;

    info!(app_id = %app_id, expires_at = claims.exp, "Signed new app assertion");
    Ok(token)
}

/// Parse PEM material into a signing key, checking it is a consistent RSA key pair.
///
/// Accepts PKCS#1 (`BEGIN RSA PRIVATE KEY`) and PKCS#8 (`BEGIN PRIVATE KEY`).
fn parse_signing_key(pem: &[u8]) -> Result<EncodingKey, KeyLoadingError> {
    let text = std::str::from_utf8(pem).map_err(|_| KeyLoadingError::InvalidKey {
        message: "PEM data is not valid UTF-8".to_string(),
    })?;
    let text = text.trim();

    if text.is_empty() {
        return Err(KeyLoadingError::InvalidKey {
            message: "PEM string cannot be empty".to_string(),
        });
    }

    if !text.contains("-----BEGIN") || !text.contains("-----END") {
        return Err(KeyLoadingError::InvalidKey {
            message: "Invalid PEM format: missing BEGIN/END markers".to_string(),
        });
    }

    let key = RsaPrivateKey::from_pkcs1_pem(text)
        .or_else(|_| RsaPrivateKey::from_pkcs8_pem(text))
        .map_err(|e| KeyLoadingError::InvalidKey {
            message: format!("Failed to parse RSA private key: {}", e),
        })?;

    key.validate().map_err(|e| KeyLoadingError::InvalidKey {
        message: format!("Not a valid RSA key pair: {}", e),
    })?;

    EncodingKey::from_rsa_pem(text.as_bytes()).map_err(|e| KeyLoadingError::InvalidKey {
        message: format!("Failed to create encoding key: {}", e),
    })
}

#[cfg(test)]
#[path = "jwt_tests.rs"]
mod tests;
