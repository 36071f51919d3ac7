//! Error types for credential and collection operations.
//!
//! Every error here is `Clone` so that the outcome of a single credential
//! regeneration can be handed to each caller that was waiting on it.
//! Transport and decode failures are captured as messages for the same reason.

use chrono::{DateTime, Utc};
use thiserror::Error;

/// Failure to produce a credential.
///
/// Raised when the signing key cannot be read or parsed, when signing fails,
/// or when a credential-exchange call to the API does not succeed. These are
/// never retried by the library; the caller decides what to do with them.
#[derive(Debug, Clone, Error)]
pub enum KeyLoadingError {
    /// The private key material could not be read from its source.
    #[error("Private key source failed: {message}")]
    KeySource { message: String },

    /// The key material is not a usable PEM-encoded RSA key pair.
    #[error("Invalid private key: {message}")]
    InvalidKey { message: String },

    /// Encoding or signing the application assertion failed.
    #[error("Assertion signing failed: {message}")]
    Signing { message: String },

    /// A credential-exchange request returned a non-success status.
    #[error("Credential exchange failed: {status} - {message}")]
    ExchangeFailed { status: u16, message: String },

    /// The credential-exchange request did not complete.
    #[error("Credential exchange transport error: {message}")]
    Transport { message: String },

    /// The credential-exchange response could not be understood.
    #[error("Malformed credential response: {message}")]
    MalformedResponse { message: String },
}

impl KeyLoadingError {
    /// HTTP status of a failed exchange, if the failure came from one.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::ExchangeFailed { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Errors raised while talking to the REST API.
#[derive(Debug, Clone, Error)]
pub enum ApiError {
    /// Request quota is exhausted. Callers should back off until `reset_at`.
    #[error("Rate limit exceeded ({status}){}", reset_suffix(.reset_at))]
    RateLimitExceeded {
        status: u16,
        reset_at: Option<DateTime<Utc>>,
        message: String,
    },

    /// Any other non-success response.
    #[error("API request to {url} failed: {status} - {message}")]
    Request {
        status: u16,
        url: String,
        message: String,
    },

    /// An operation was attempted in a state that does not allow it.
    #[error("Invalid state: {message}")]
    InvalidState { message: String },

    /// The authorization header could not be produced.
    #[error("Credential error: {0}")]
    Credential(#[from] KeyLoadingError),

    /// Network, TLS or timeout failure.
    #[error("HTTP transport error: {message}")]
    Transport { message: String },

    /// The response body did not have the expected shape.
    #[error("Failed to decode response: {message}")]
    Decode { message: String },
}

fn reset_suffix(reset_at: &Option<DateTime<Utc>>) -> String {
    match reset_at {
        Some(at) => format!(". Reset at: {}", at),
        None => String::new(),
    }
}

impl ApiError {
    /// True for the rate-limit variant.
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, Self::RateLimitExceeded { .. })
    }

    /// Check if this error represents a transient condition that may succeed if retried.
    ///
    /// Transient conditions include:
    /// - Server errors (5xx)
    /// - Rate limiting
    /// - Network/transport errors
    pub fn is_transient(&self) -> bool {
        match self {
            Self::RateLimitExceeded { .. } => true,
            Self::Request { status, .. } => *status >= 500,
            Self::InvalidState { .. } => false,
            Self::Credential(e) => matches!(e, KeyLoadingError::Transport { .. }),
            Self::Transport { .. } => true,
            Self::Decode { .. } => false,
        }
    }

    /// HTTP status associated with the failure, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::RateLimitExceeded { status, .. } | Self::Request { status, .. } => Some(*status),
            Self::Credential(e) => e.status(),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(e: reqwest::Error) -> Self {
        Self::Transport {
            message: e.to_string(),
        }
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(e: serde_json::Error) -> Self {
        Self::Decode {
            message: e.to_string(),
        }
    }
}

/// Input validation errors.
///
/// These errors occur when validating identifiers or configuration data.
#[derive(Debug, Clone, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("Required field missing: {field}")]
    Required { field: String },

    /// A field has an invalid format.
    #[error("Invalid format for {field}: {message}")]
    InvalidFormat { field: String, message: String },

    /// A field value is out of the acceptable range.
    #[error("Value out of range for {field}: {message}")]
    OutOfRange { field: String, message: String },
}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
