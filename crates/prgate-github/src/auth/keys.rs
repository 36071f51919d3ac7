//! Private key sources for app assertion signing.
//!
//! The key is fetched from its source on every assertion regeneration, so a
//! rotated key file or secret is picked up without restarting.

use async_trait::async_trait;
use std::path::PathBuf;
use zeroize::Zeroizing;

use crate::error::KeyLoadingError;

/// Interface for retrieving the App's PEM-encoded private key.
#[async_trait]
pub trait PrivateKeySource: Send + Sync {
    /// Read the current key material.
    ///
    /// # Errors
    ///
    /// Returns `KeyLoadingError::KeySource` if the material cannot be read.
    async fn private_key_pem(&self) -> Result<Zeroizing<Vec<u8>>, KeyLoadingError>;
}

/// Key material held in memory.
#[derive(Clone)]
pub struct StaticPrivateKey {
    pem: Zeroizing<Vec<u8>>,
}

impl StaticPrivateKey {
    /// Wrap PEM bytes.
    pub fn new(pem: impl Into<Vec<u8>>) -> Self {
        Self {
            pem: Zeroizing::new(pem.into()),
        }
    }
}

impl std::fmt::Debug for StaticPrivateKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StaticPrivateKey")
            .field("pem", &"<REDACTED>")
            .finish()
    }
}

#[async_trait]
impl PrivateKeySource for StaticPrivateKey {
    async fn private_key_pem(&self) -> Result<Zeroizing<Vec<u8>>, KeyLoadingError> {
        Ok(self.pem.clone())
    }
}

/// Key material read from a file each time it is needed.
#[derive(Debug, Clone)]
pub struct FilePrivateKey {
    path: PathBuf,
}

impl FilePrivateKey {
    /// Read the key from `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// The file the key is read from.
    pub fn path(&self) -> &std::path::Path {
        &self.path
    }
}

#[async_trait]
impl PrivateKeySource for FilePrivateKey {
    async fn private_key_pem(&self) -> Result<Zeroizing<Vec<u8>>, KeyLoadingError> {
        tokio::fs::read(&self.path)
            .await
            .map(Zeroizing::new)
            .map_err(|e| KeyLoadingError::KeySource {
                message: format!("Failed to read {}: {}", self.path.display(), e),
            })
    }
}

/// Key material read from an environment variable each time it is needed.
///
/// Literal `\n` sequences are expanded to newlines, since many secret stores
/// flatten multi-line values that way.
#[derive(Debug, Clone)]
pub struct EnvPrivateKey {
    variable: String,
}

impl EnvPrivateKey {
    /// Read the key from the environment variable `variable`.
    pub fn new(variable: impl Into<String>) -> Self {
        Self {
            variable: variable.into(),
        }
    }
}

#[async_trait]
impl PrivateKeySource for EnvPrivateKey {
    async fn private_key_pem(&self) -> Result<Zeroizing<Vec<u8>>, KeyLoadingError> {
        let value = Zeroizing::new(std::env::var(&self.variable).map_err(|e| {
            KeyLoadingError::KeySource {
                message: format!("Environment variable {}: {}", self.variable, e),
            }
        })?);

        Ok(Zeroizing::new(value.replace("\\n", "\n").into_bytes()))
    }
}

#[cfg(test)]
#[path = "keys_tests.rs"]
mod tests;
