//! Lazy HTTP-backed page sequence.

use async_trait::async_trait;
use reqwest::Method;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::sync::Arc;
use tracing::debug;

use super::{PageLinkSet, PageSource};
use crate::auth::AuthorizationProvider;
use crate::client::{ensure_success, parse_rate_limit_from_headers, GitHubClient, RateLimit};
use crate::error::ApiError;

type Mapper<T> = Arc<dyn Fn(Value) -> Result<T, ApiError> + Send + Sync>;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Cursor {
    Page(String),
    Exhausted,
}

/// A paginated collection fetched one page per call.
///
/// The sequence starts at the URL it was created with and follows the `next`
/// link of each response. It is not restartable: once exhausted, create a new
/// one. A failed fetch leaves the cursor where it was, so the same page can be
/// requested again.
///
/// # Examples
///
/// ```no_run
/// use prgate_github::auth::StaticAuthorization;
/// use prgate_github::client::{ClientConfig, GitHubClient};
/// use prgate_github::files::PullRequestFile;
/// use std::sync::Arc;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let client = GitHubClient::new(ClientConfig::new("release-gate/1.0"))?;
/// let auth = Arc::new(StaticAuthorization::new("token ghp_example"));
///
/// let mut names = client
///     .paged::<PullRequestFile>(client.api_url("repos/o/r/pulls/1/files"), auth)
///     .map(|file| file.filename);
///
/// while names.has_next() {
///     for name in names.next_page().await? {
///         println!("{}", name);
///     }
/// }
/// # Ok(())
/// # }
/// ```
pub struct PagedSequence<T> {
    client: GitHubClient,
    auth: Arc<dyn AuthorizationProvider>,
    cursor: Cursor,
    mapper: Mapper<T>,
    pages_fetched: usize,
    rate_limit: Option<RateLimit>,
}

impl<T> PagedSequence<T>
where
    T: Send + 'static,
{
    /// Create a sequence that deserializes each element as `T`.
    pub fn new(
        client: GitHubClient,
        url: impl Into<String>,
        auth: Arc<dyn AuthorizationProvider>,
    ) -> Self
    where
        T: DeserializeOwned,
    {
        Self::with_mapper(client, url, auth, |value| {
            serde_json::from_value(value).map_err(ApiError::from)
        })
    }

    /// Create a sequence that converts each raw element with `mapper`.
    pub fn with_mapper<F>(
        client: GitHubClient,
        url: impl Into<String>,
        auth: Arc<dyn AuthorizationProvider>,
        mapper: F,
    ) -> Self
    where
        F: Fn(Value) -> Result<T, ApiError> + Send + Sync + 'static,
    {
        Self {
            client,
            auth,
            cursor: Cursor::Page(url.into()),
            mapper: Arc::new(mapper),
            pages_fetched: 0,
            rate_limit: None,
        }
    }

    /// True while a page remains to be fetched.
    pub fn has_next(&self) -> bool {
        matches!(self.cursor, Cursor::Page(_))
    }

    /// URL the next call to [`next_page`](Self::next_page) will request.
    pub fn next_url(&self) -> Option<&str> {
        match &self.cursor {
            Cursor::Page(url) => Some(url),
            Cursor::Exhausted => None,
        }
    }

    /// Number of pages fetched successfully so far.
    pub fn pages_fetched(&self) -> usize {
        self.pages_fetched
    }

    /// Quota reported by the most recent successful response.
    pub fn rate_limit(&self) -> Option<&RateLimit> {
        self.rate_limit.as_ref()
    }

    /// Fetch the page at the cursor and advance.
    ///
    /// # Errors
    ///
    /// - `ApiError::InvalidState` if the sequence is exhausted
    /// - `ApiError::RateLimitExceeded` if the quota is used up
    /// - `ApiError::Request` for any other non-success response, 404 included
    /// - `ApiError::Decode` if the body is not a JSON array or an element does
    ///   not map
    pub async fn next_page(&mut self) -> Result<Vec<T>, ApiError> {
        let url = match &self.cursor {
            Cursor::Page(url) => url.clone(),
            Cursor::Exhausted => {
                return Err(ApiError::InvalidState {
                    message: "next_page() called on an exhausted sequence".to_string(),
                })
            }
        };

        let authorization = self.auth.authorization().await?;
        let response = self
            .client
            .request(Method::GET, &url, &authorization)
            .send()
            .await?;
        let response = ensure_success(&url, response).await?;

        let links = PageLinkSet::from_headers(&url, response.headers());
        let rate_limit = parse_rate_limit_from_headers(response.headers());

        let bytes = response.bytes().await?;
        let elements: Vec<Value> = serde_json::from_slice(&bytes)?;
        let page = elements
            .into_iter()
            .map(|value| (self.mapper)(value))
            .collect::<Result<Vec<T>, ApiError>>()?;

        self.cursor = match links.next() {
            Some(next) if links.has_next(&url) => Cursor::Page(next.to_string()),
            _ => Cursor::Exhausted,
        };
        self.pages_fetched += 1;
        if rate_limit.is_some() {
            self.rate_limit = rate_limit;
        }

        debug!(
            url = %url,
            elements = page.len(),
            pages_fetched = self.pages_fetched,
            has_next = self.has_next(),
            "Fetched page"
        );
        Ok(page)
    }

    /// Apply `f` to every element of every page fetched from now on.
    ///
    /// Network behavior is unchanged; `f` runs as each page arrives.
    pub fn map<U, F>(self, f: F) -> PagedSequence<U>
    where
        U: Send + 'static,
        F: Fn(T) -> U + Send + Sync + 'static,
    {
        let inner = self.mapper;
        PagedSequence {
            client: self.client,
            auth: self.auth,
            cursor: self.cursor,
            mapper: Arc::new(move |value| inner(value).map(&f)),
            pages_fetched: self.pages_fetched,
            rate_limit: self.rate_limit,
        }
    }

    /// Fetch every remaining page and concatenate the elements in order.
    pub async fn collect_all(mut self) -> Result<Vec<T>, ApiError> {
        let collected = super::reduce(
            &mut self,
            |acc: Option<Vec<T>>, element| {
                let mut all = acc.unwrap_or_default();
                all.push(element);
                all
            },
            |_| false,
        )
        .await?;
        Ok(collected.unwrap_or_default())
    }
}

impl<T> std::fmt::Debug for PagedSequence<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PagedSequence")
            .field("cursor", &self.cursor)
            .field("pages_fetched", &self.pages_fetched)
            .finish()
    }
}

#[async_trait]
impl<T> PageSource for PagedSequence<T>
where
    T: Send + 'static,
{
    type Item = T;

    fn has_next(&self) -> bool {
        PagedSequence::has_next(self)
    }

    async fn next_page(&mut self) -> Result<Vec<T>, ApiError> {
        PagedSequence::next_page(self).await
    }
}

#[cfg(test)]
#[path = "sequence_tests.rs"]
mod tests;
