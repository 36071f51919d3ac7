//! Folding pages with early termination.

use tracing::debug;

use super::PageSource;
use crate::error::ApiError;

/// Folds a [`PageSource`] page by page until a completion condition holds.
///
/// Whole pages are folded: the result reflects every element up to and
/// including the page on which `is_complete` first returned true, and no
/// page after that one is requested.
///
/// # Examples
///
/// ```no_run
/// use prgate_github::pagination::{PageSource, ShortCircuitAccumulator};
/// use prgate_github::error::ApiError;
///
/// # async fn example(pages: &mut impl PageSource<Item = u32>) -> Result<(), ApiError> {
/// // Stop as soon as the running total reaches 100.
/// let total = ShortCircuitAccumulator::new(
///     |acc: Option<u32>, n: u32| acc.unwrap_or(0) + n,
///     |total: &u32| *total >= 100,
/// )
/// .reduce(pages)
/// .await?;
/// # Ok(())
/// # }
/// ```
pub struct ShortCircuitAccumulator<R, P> {
    reducer: R,
    is_complete: P,
}

impl<R, P> ShortCircuitAccumulator<R, P> {
    /// Combine elements with `reducer` and stop once `is_complete` holds.
    pub fn new(reducer: R, is_complete: P) -> Self {
        Self {
            reducer,
            is_complete,
        }
    }

    /// Drive `source` to completion or exhaustion.
    ///
    /// Returns `None` if no element was folded, which includes a source that
    /// had no pages.
    ///
    /// # Errors
    ///
    /// Returns the first error raised by `source`; elements folded before it
    /// are discarded.
    pub async fn reduce<S, A>(mut self, source: &mut S) -> Result<Option<A>, ApiError>
    where
        S: PageSource + ?Sized,
        R: FnMut(Option<A>, S::Item) -> A,
        P: Fn(&A) -> bool,
    {
        if !source.has_next() {
            return Ok(None);
        }

        let mut accumulated = self.fold_page(None, source.next_page().await?);
        let mut pages = 1usize;

        while !self.satisfied(&accumulated) && source.has_next() {
            let page = source.next_page().await?;
            accumulated = self.fold_page(accumulated, page);
            pages += 1;
        }

        debug!(
            pages,
            complete = self.satisfied(&accumulated),
            exhausted = !source.has_next(),
            "Finished paged reduction"
        );
        Ok(accumulated)
    }

    fn fold_page<T, A>(&mut self, accumulated: Option<A>, page: Vec<T>) -> Option<A>
    where
        R: FnMut(Option<A>, T) -> A,
    {
        page.into_iter()
            .fold(accumulated, |acc, element| Some((self.reducer)(acc, element)))
    }

    fn satisfied<A>(&self, accumulated: &Option<A>) -> bool
    where
        P: Fn(&A) -> bool,
    {
        accumulated.as_ref().is_some_and(|acc| (self.is_complete)(acc))
    }
}

/// Shorthand for `ShortCircuitAccumulator::new(reducer, is_complete).reduce(source)`.
pub async fn reduce<S, A, R, P>(
    source: &mut S,
    reducer: R,
    is_complete: P,
) -> Result<Option<A>, ApiError>
where
    S: PageSource + ?Sized,
    R: FnMut(Option<A>, S::Item) -> A,
    P: Fn(&A) -> bool,
{
    ShortCircuitAccumulator::new(reducer, is_complete)
        .reduce(source)
        .await
}

#[cfg(test)]
#[path = "accumulate_tests.rs"]
mod tests;
