//! `Link` header parsing.
//!
//! GitHub paginates collections with headers like:
//!
//! ```text
//! Link: <https://api.github.com/repositories/1/pulls/1/files?page=2>; rel="next",
//!       <https://api.github.com/repositories/1/pulls/1/files?page=5>; rel="last"
//! ```

use reqwest::header::{HeaderMap, LINK};
use tracing::warn;
use url::Url;

/// Navigation links for one page of a collection.
///
/// Two defaulting rules fill gaps GitHub leaves on short collections:
///
/// - without `next`, a `last` link that is not the current page stands in for `next`;
/// - without `prev`, a `first` link that is not the current page stands in for `prev`.
///
/// Pages are compared by their `page` and `per_page` query parameters. A
/// missing `page` parameter means page 1.
///
/// # Examples
///
/// ```
/// use prgate_github::pagination::PageLinkSet;
///
/// let current = "https://api.github.com/repos/o/r/pulls/1/files";
/// let links = PageLinkSet::parse(
///     current,
///     &[r#"<https://api.github.com/repos/o/r/pulls/1/files?page=2>; rel="next", <https://api.github.com/repos/o/r/pulls/1/files?page=3>; rel="last""#],
/// );
///
/// assert!(links.has_next(current));
/// assert_eq!(links.next(), Some("https://api.github.com/repos/o/r/pulls/1/files?page=2"));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageLinkSet {
    first: Option<String>,
    prev: Option<String>,
    next: Option<String>,
    last: Option<String>,
}

impl PageLinkSet {
    /// Parse the `Link` header values of the response to `current_url`.
    ///
    /// Each value may hold several comma-separated `<url>; rel="name"`
    /// entries; commas inside a URL do not separate entries. Entries that
    /// cannot be parsed are skipped with a warning. Relative URLs are
    /// resolved against `current_url`.
    pub fn parse(current_url: &str, header_values: &[&str]) -> Self {
        let base = Url::parse(current_url).ok();
        let mut links = Self::default();

        for entry in header_values.iter().flat_map(|value| split_entries(value)) {
            if entry.trim().is_empty() {
                continue;
            }
            match parse_entry(entry, base.as_ref()) {
                Some((url, rels)) => {
                    for rel in rels {
                        links.assign(&rel, &url);
                    }
                }
                None => warn!(entry = %entry.trim(), "Ignoring malformed Link entry"),
            }
        }

        if links.next.is_none() && !links.is_last_page(current_url) {
            links.next = links.last.clone();
        }
        if links.prev.is_none() && !links.is_first_page(current_url) {
            links.prev = links.first.clone();
        }

        links
    }

    /// Parse every `Link` header in `headers`.
    ///
    /// Values that are not valid header text are skipped.
    pub fn from_headers(current_url: &str, headers: &HeaderMap) -> Self {
        let values: Vec<&str> = headers
            .get_all(LINK)
            .iter()
            .filter_map(|value| value.to_str().ok())
            .collect();
        Self::parse(current_url, &values)
    }

    fn assign(&mut self, rel: &str, url: &str) {
        let slot = match rel {
            "first" => &mut self.first,
            "prev" => &mut self.prev,
            "next" => &mut self.next,
            "last" => &mut self.last,
            _ => return,
        };
        *slot = Some(url.to_string());
    }

    /// URL of the first page.
    pub fn first(&self) -> Option<&str> {
        self.first.as_deref()
    }

    /// URL of the previous page.
    pub fn prev(&self) -> Option<&str> {
        self.prev.as_deref()
    }

    /// URL of the next page.
    pub fn next(&self) -> Option<&str> {
        self.next.as_deref()
    }

    /// URL of the last page.
    pub fn last(&self) -> Option<&str> {
        self.last.as_deref()
    }

    /// True if another page follows `current_url`.
    ///
    /// A stray `next` link on the page that `last` points at is not followed.
    pub fn has_next(&self, current_url: &str) -> bool {
        self.next.is_some() && !self.is_last_page(current_url)
    }

    /// True if `current_url` is the last page.
    ///
    /// Without a `last` link, the page is last when it has no `next` link.
    pub fn is_last_page(&self, current_url: &str) -> bool {
        match &self.last {
            Some(last) => same_page(current_url, last),
            None => self.next.is_none(),
        }
    }

    fn is_first_page(&self, current_url: &str) -> bool {
        match &self.first {
            Some(first) => same_page(current_url, first),
            None => self.prev.is_none(),
        }
    }
}

/// Split a header value on the commas that separate entries.
///
/// A comma inside `<...>` belongs to the URL. An entry whose `<` is never
/// closed ends at the next comma followed by `<`, so it is dropped as
/// malformed without swallowing the entry after it.
fn split_entries(value: &str) -> Vec<&str> {
    let mut entries = Vec::new();
    let mut start = 0;

    for (index, _) in value.match_indices(',') {
        let rest = value[index + 1..].trim_start();
        if has_open_url(&value[start..index]) && !rest.starts_with('<') {
            continue;
        }
        entries.push(&value[start..index]);
        start = index + 1;
    }
    entries.push(&value[start..]);
    entries
}

fn has_open_url(fragment: &str) -> bool {
    match (fragment.rfind('<'), fragment.rfind('>')) {
        (Some(open), Some(close)) => open > close,
        (Some(_), None) => true,
        _ => false,
    }
}

/// Parse one `<url>; rel="a b"` entry into its URL and relation names.
fn parse_entry(entry: &str, base: Option<&Url>) -> Option<(String, Vec<String>)> {
    let entry = entry.trim();
    let rest = entry.strip_prefix('<')?;
    let (target, params) = rest.split_once('>')?;

    let rels: Vec<String> = params
        .split(';')
        .filter_map(|param| {
            let (name, value) = param.split_once('=')?;
            if !name.trim().eq_ignore_ascii_case("rel") {
                return None;
            }
            Some(value.trim().trim_matches('"').to_string())
        })
        .flat_map(|value| {
            value
                .split_whitespace()
                .map(str::to_ascii_lowercase)
                .collect::<Vec<_>>()
        })
        .collect();
    if rels.is_empty() {
        return None;
    }

    let url = match Url::parse(target.trim()) {
        Ok(url) => url,
        Err(url::ParseError::RelativeUrlWithoutBase) => base?.join(target.trim()).ok()?,
        Err(_) => return None,
    };

    Some((url.to_string(), rels))
}

/// Compare two page URLs by their `page` and `per_page` parameters.
fn same_page(a: &str, b: &str) -> bool {
    match (Url::parse(a), Url::parse(b)) {
        (Ok(a), Ok(b)) => page_key(&a) == page_key(&b),
        _ => a == b,
    }
}

fn page_key(url: &Url) -> (String, Option<String>) {
    let mut page = None;
    let mut per_page = None;
    for (name, value) in url.query_pairs() {
        match name.as_ref() {
            "page" => page = Some(value.into_owned()),
            "per_page" => per_page = Some(value.into_owned()),
            _ => {}
        }
    }
    (page.unwrap_or_else(|| "1".to_string()), per_page)
}

#[cfg(test)]
#[path = "links_tests.rs"]
mod tests;
