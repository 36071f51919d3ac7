//! Rate limit metadata for GitHub API responses.
//!
//! GitHub enforces rate limits on API requests and reports the current state in
//! response headers. This module parses those headers and decides whether a
//! failed response was caused by quota exhaustion.

use chrono::{DateTime, TimeZone, Utc};
use reqwest::header::HeaderMap;
use reqwest::StatusCode;

const LIMIT_HEADER: &str = "x-ratelimit-limit";
const REMAINING_HEADER: &str = "x-ratelimit-remaining";
const RESET_HEADER: &str = "x-ratelimit-reset";
const RESOURCE_HEADER: &str = "x-ratelimit-resource";

/// Rate limit information from GitHub API response headers.
///
/// GitHub includes rate limit information in HTTP response headers:
/// - `X-RateLimit-Limit`: Maximum requests allowed per window
/// - `X-RateLimit-Remaining`: Requests remaining in current window
/// - `X-RateLimit-Reset`: Unix timestamp when the rate limit resets
///
/// # Examples
///
/// ```
/// use prgate_github::client::RateLimit;
/// use chrono::{Utc, Duration};
///
/// let reset_time = Utc::now() + Duration::hours(1);
/// let rate_limit = RateLimit::new(5000, 4500, reset_time, "core");
///
/// assert!(!rate_limit.is_exhausted());
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateLimit {
    limit: u32,
    remaining: u32,
    reset_at: DateTime<Utc>,
    resource: String,
}

impl RateLimit {
    /// Create a new rate limit record.
    pub fn new(
        limit: u32,
        remaining: u32,
        reset_at: DateTime<Utc>,
        resource: impl Into<String>,
    ) -> Self {
        Self {
            limit,
            remaining,
            reset_at,
            resource: resource.into(),
        }
    }

    /// Get the maximum number of requests allowed.
    pub fn limit(&self) -> u32 {
        self.limit
    }

    /// Get the number of requests remaining.
    pub fn remaining(&self) -> u32 {
        self.remaining
    }

    /// Get when the rate limit resets.
    pub fn reset_at(&self) -> DateTime<Utc> {
        self.reset_at
    }

    /// Get the resource this rate limit applies to.
    pub fn resource(&self) -> &str {
        &self.resource
    }

    /// Check if the rate limit is exhausted (no requests remaining).
    pub fn is_exhausted(&self) -> bool {
        self.remaining == 0
    }
}

/// Parse rate limit information from HTTP response headers.
///
/// `X-RateLimit-Resource` is optional and defaults to `"core"`.
///
/// # Returns
///
/// `Some(RateLimit)` if the limit, remaining and reset headers are present and
/// valid, `None` otherwise.
pub fn parse_rate_limit_from_headers(headers: &HeaderMap) -> Option<RateLimit> {
    let limit = header_str(headers, LIMIT_HEADER)?.parse::<u32>().ok()?;
    let remaining = header_str(headers, REMAINING_HEADER)?.parse::<u32>().ok()?;
    let reset_secs = header_str(headers, RESET_HEADER)?.parse::<i64>().ok()?;
    let reset_at = Utc.timestamp_opt(reset_secs, 0).single()?;
    let resource = header_str(headers, RESOURCE_HEADER).unwrap_or("core");

    Some(RateLimit::new(limit, remaining, reset_at, resource))
}

/// Decide whether a failed response signals quota exhaustion.
///
/// True only for 403 or 429 responses whose `X-RateLimit-Remaining` header is
/// exactly `0`. A missing or nonzero header means an ordinary failure.
pub fn is_rate_limit_response(status: StatusCode, headers: &HeaderMap) -> bool {
    let limited_status =
        status == StatusCode::FORBIDDEN || status == StatusCode::TOO_MANY_REQUESTS;
    limited_status && header_str(headers, REMAINING_HEADER) == Some("0")
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
}

#[cfg(test)]
#[path = "rate_limit_tests.rs"]
mod tests;
