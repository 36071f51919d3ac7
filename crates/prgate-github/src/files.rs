//! Pull request file classification.
//!
//! [`fetch_classified_files`] answers "does this pull request touch production
//! code, and does it touch release notes?" by walking the pull request's
//! changed-file listing and stopping as soon as both answers are yes.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;

use crate::auth::AuthorizationProvider;
use crate::client::GitHubClient;
use crate::error::ApiError;
use crate::pagination::reduce;

/// One entry of `GET /repos/{owner}/{repo}/pulls/{number}/files`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PullRequestFile {
    /// Path of the file after the change
    pub filename: String,
    /// `added`, `removed`, `modified`, `renamed`, `copied`, `changed` or `unchanged`
    pub status: String,
    /// Blob SHA of the file after the change; absent for some removals
    #[serde(default)]
    pub sha: Option<String>,
    /// Lines added
    #[serde(default)]
    pub additions: u64,
    /// Lines removed
    #[serde(default)]
    pub deletions: u64,
    /// Total lines changed
    #[serde(default)]
    pub changes: u64,
    /// Path before a rename
    #[serde(default)]
    pub previous_filename: Option<String>,
}

/// What a set of changed files touches.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileClassification {
    /// At least one file is production code
    pub touches_production: bool,
    /// At least one file is a release note
    pub touches_release_notes: bool,
}

impl FileClassification {
    /// Combine two classifications; a flag is set if either side sets it.
    pub fn merge(self, other: Self) -> Self {
        Self {
            touches_production: self.touches_production || other.touches_production,
            touches_release_notes: self.touches_release_notes || other.touches_release_notes,
        }
    }

    /// True once both flags are set; no further file can change the answer.
    pub fn is_complete(&self) -> bool {
        self.touches_production && self.touches_release_notes
    }
}

/// Decides what a single changed file touches.
pub trait FileClassifier: Send + Sync {
    /// Classify `file`; a renamed file may be judged by either path.
    fn classify(&self, file: &PullRequestFile) -> FileClassification;
}

/// Classify the files of a pull request.
///
/// `pull_request_files_url` is the pull request's files collection, e.g.
/// `https://api.github.com/repos/o/r/pulls/7/files`. Pages are requested only
/// until both flags are set.
///
/// # Errors
///
/// Returns any `ApiError` raised while fetching a page, including
/// `ApiError::Credential` when `auth` cannot produce a header.
pub async fn fetch_classified_files(
    client: &GitHubClient,
    auth: Arc<dyn AuthorizationProvider>,
    pull_request_files_url: &str,
    classifier: Arc<dyn FileClassifier>,
) -> Result<FileClassification, ApiError> {
    let mut pages = client
        .paged::<PullRequestFile>(pull_request_files_url, auth)
        .map(move |file| classifier.classify(&file));

    let classification = reduce(
        &mut pages,
        |acc: Option<FileClassification>, file| acc.unwrap_or_default().merge(file),
        FileClassification::is_complete,
    )
    .await?
    .unwrap_or_default();

    info!(
        url = %pull_request_files_url,
        pages = pages.pages_fetched(),
        touches_production = classification.touches_production,
        touches_release_notes = classification.touches_release_notes,
        "Classified pull request files"
    );
    Ok(classification)
}

#[cfg(test)]
#[path = "files_tests.rs"]
mod tests;
