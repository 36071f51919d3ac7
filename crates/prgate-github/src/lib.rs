//! # prgate GitHub
//!
//! GitHub App authentication and short-circuiting pagination for pull request
//! checks.
//!
//! This crate provides:
//! - A single-flight expiring cache for short-lived credentials
//! - App assertion (JWT) signing and installation token exchange
//! - `Link`-header pagination with a lazy page sequence
//! - A fold over pages that stops requesting once it has its answer
//!
//! # Examples
//!
//! ## Classifying a pull request's files
//!
//! ```rust,no_run
//! use prgate_github::auth::{AppId, ApplicationCredential, FilePrivateKey, InstallationCredential};
//! use prgate_github::client::{ClientConfig, GitHubClient};
//! use prgate_github::files::{
//!     fetch_classified_files, FileClassification, FileClassifier, PullRequestFile,
//! };
//! use std::sync::Arc;
//!
//! struct ByPrefix;
//!
//! impl FileClassifier for ByPrefix {
//!     fn classify(&self, file: &PullRequestFile) -> FileClassification {
//!         FileClassification {
//!             touches_production: file.filename.starts_with("src/"),
//!             touches_release_notes: file.filename.starts_with("changes/"),
//!         }
//!     }
//! }
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = GitHubClient::new(ClientConfig::new("release-gate/1.0"))?;
//! let app = Arc::new(ApplicationCredential::new(
//!     AppId::new("123456")?,
//!     Arc::new(FilePrivateKey::new("/etc/prgate/app.pem")),
//! ));
//!
//! let installation = InstallationCredential::for_repository(
//!     client.clone(),
//!     &client.api_url("repos/octo/widgets"),
//!     app,
//! )
//! .await?;
//!
//! let classification = fetch_classified_files(
//!     &client,
//!     Arc::new(installation),
//!     &client.api_url("repos/octo/widgets/pulls/7/files"),
//!     Arc::new(ByPrefix),
//! )
//! .await?;
//!
//! println!("{:?}", classification);
//! # Ok(())
//! # }
//! ```

pub mod auth;
pub mod cache;
pub mod client;
pub mod error;
pub mod files;
pub mod pagination;

pub use error::{ApiError, KeyLoadingError, ValidationError};

pub use auth::{
    AppId, ApplicationCredential, AuthorizationProvider, CredentialConfig, InstallationCredential,
};
pub use cache::ExpiringCache;
pub use client::{ClientConfig, GitHubClient, RateLimit};
pub use files::{fetch_classified_files, FileClassification, FileClassifier, PullRequestFile};
pub use pagination::{PageLinkSet, PageSource, PagedSequence, ShortCircuitAccumulator};
