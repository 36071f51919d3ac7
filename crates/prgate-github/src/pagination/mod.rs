//! Page-at-a-time access to paginated collections.
//!
//! - [`PageLinkSet`] reads the `Link` header of a response.
//! - [`PagedSequence`] fetches successive pages on demand.
//! - [`ShortCircuitAccumulator`] folds pages and stops requesting more once
//!   the caller has what it needs.

mod accumulate;
mod links;
mod sequence;

use async_trait::async_trait;

use crate::error::ApiError;

pub use accumulate::{reduce, ShortCircuitAccumulator};
pub use links::PageLinkSet;
pub use sequence::PagedSequence;

/// A pull-based source of pages, stepped by the caller.
///
/// [`PagedSequence`] is the HTTP-backed implementation.
#[async_trait]
pub trait PageSource: Send {
    /// Element type of each page.
    type Item: Send;

    /// True while another page can be fetched.
    fn has_next(&self) -> bool;

    /// Fetch the next page.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::InvalidState` if the source is exhausted, or the
    /// error that prevented the page from being fetched.
    async fn next_page(&mut self) -> Result<Vec<Self::Item>, ApiError>;
}
