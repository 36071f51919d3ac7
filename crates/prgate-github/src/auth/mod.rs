//! GitHub App authentication.
//!
//! Authentication is a two-tier chain:
//!
//! 1. [`ApplicationCredential`] signs a short-lived RS256 assertion (JWT)
//!    proving the caller is the App itself.
//! 2. [`InstallationCredential`] redeems that assertion for an installation
//!    access token scoped to one account's installation of the App.
//!
//! Both cache their value in an [`ExpiringCache`](crate::cache::ExpiringCache)
//! and renew it transparently. Anything that needs an `Authorization` header
//! depends on the [`AuthorizationProvider`] trait rather than a concrete
//! credential.

mod installation;
mod jwt;
mod keys;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::time::Duration;

use crate::error::{KeyLoadingError, ValidationError};

pub use installation::InstallationCredential;
pub use jwt::{ApplicationCredential, AssertionClaims};
pub use keys::{EnvPrivateKey, FilePrivateKey, PrivateKeySource, StaticPrivateKey};

/// Maximum assertion lifetime accepted by GitHub.
pub const MAX_ASSERTION_LIFETIME: Duration = Duration::from_secs(10 * 60);

/// Minimum assertion lifetime; must leave room for [`ASSERTION_RENEWAL_MARGIN`].
pub const MIN_ASSERTION_LIFETIME: Duration = Duration::from_secs(2 * 60);

/// A cached assertion is renewed this long before its `exp` claim.
pub const ASSERTION_RENEWAL_MARGIN: Duration = Duration::from_secs(60);

/// Maximum installation token lifetime issued by GitHub.
pub const MAX_INSTALLATION_TOKEN_LIFETIME: Duration = Duration::from_secs(60 * 60);

const MIN_INSTALLATION_TOKEN_LIFETIME: Duration = Duration::from_secs(1);

// ============================================================================
// Identifiers
// ============================================================================

/// GitHub App identifier, used as the `iss` claim of app assertions.
///
/// Either the numeric App ID or the App's client ID is accepted by GitHub,
/// so the value is kept as text.
///
/// # Examples
///
/// ```
/// use prgate_github::auth::AppId;
///
/// let app_id: AppId = "123456".parse().unwrap();
/// assert_eq!(app_id.as_str(), "123456");
/// assert!("".parse::<AppId>().is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct AppId(String);

impl AppId {
    /// Create an App ID, rejecting blank values.
    pub fn new(id: impl Into<String>) -> Result<Self, ValidationError> {
        let id = id.into();
        let trimmed = id.trim();
        if trimmed.is_empty() {
            return Err(ValidationError::Required {
                field: "app_id".to_string(),
            });
        }
        Ok(Self(trimmed.to_string()))
    }

    /// Get the identifier text.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for AppId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for AppId {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for AppId {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<AppId> for String {
    fn from(value: AppId) -> Self {
        value.0
    }
}

// ============================================================================
// Configuration
// ============================================================================

/// Lifetimes used when caching credentials.
///
/// Defaults stay one minute below GitHub's limits to tolerate clock drift
/// between this host and the API.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CredentialConfig {
    /// How long an app assertion is valid; it is cached for one
    /// [`ASSERTION_RENEWAL_MARGIN`] less
    pub assertion_lifetime: Duration,
    /// How long an installation token is cached
    pub installation_token_lifetime: Duration,
}

impl Default for CredentialConfig {
    fn default() -> Self {
        Self {
            assertion_lifetime: Duration::from_secs(9 * 60),
            installation_token_lifetime: Duration::from_secs(59 * 60),
        }
    }
}

impl CredentialConfig {
    /// Check the lifetimes are within GitHub's limits.
    pub fn validate(&self) -> Result<(), ValidationError> {
        check_assertion_lifetime(self.assertion_lifetime)?;
        check_installation_token_lifetime(self.installation_token_lifetime)
    }
}

pub(crate) fn check_assertion_lifetime(value: Duration) -> Result<(), ValidationError> {
    check_lifetime(
        "assertion_lifetime",
        value,
        MIN_ASSERTION_LIFETIME,
        MAX_ASSERTION_LIFETIME,
    )
}

pub(crate) fn check_installation_token_lifetime(value: Duration) -> Result<(), ValidationError> {
    check_lifetime(
        "installation_token_lifetime",
        value,
        MIN_INSTALLATION_TOKEN_LIFETIME,
        MAX_INSTALLATION_TOKEN_LIFETIME,
    )
}

fn check_lifetime(
    field: &str,
    value: Duration,
    min: Duration,
    max: Duration,
) -> Result<(), ValidationError> {
    if value < min || value > max {
        return Err(ValidationError::OutOfRange {
            field: field.to_string(),
            message: format!("must be between {}s and {}s", min.as_secs(), max.as_secs()),
        });
    }
    Ok(())
}

// ============================================================================
// Authorization seam
// ============================================================================

/// Source of `Authorization` header values.
///
/// Implemented by both credential tiers; request code depends only on this.
#[async_trait]
pub trait AuthorizationProvider: Send + Sync {
    /// Produce a complete header value, e.g. `Bearer <jwt>` or `token <token>`.
    async fn authorization(&self) -> Result<String, KeyLoadingError>;
}

/// A fixed authorization header value.
///
/// Useful for personal access tokens and tests. The value is redacted from
/// `Debug` output.
#[derive(Clone)]
pub struct StaticAuthorization {
    value: String,
}

impl StaticAuthorization {
    /// Wrap a complete header value.
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
        }
    }
}

impl std::fmt::Debug for StaticAuthorization {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StaticAuthorization")
            .field("value", &"<REDACTED>")
            .finish()
    }
}

#[async_trait]
impl AuthorizationProvider for StaticAuthorization {
    async fn authorization(&self) -> Result<String, KeyLoadingError> {
        Ok(self.value.clone())
    }
}

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;
