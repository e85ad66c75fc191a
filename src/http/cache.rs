//! HTTP cache control module
//!
//! Provides `ETag` generation, conditional request handling and the
//! Cache-Control policy an edge cache in front of the proxy will follow.

use hyper::StatusCode;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

/// Generate `ETag` using fast hashing
///
/// # Arguments
/// * `content` - Asset content
///
/// # Returns
/// Quoted `ETag` string, e.g., `"abc123def"`
pub fn generate_etag(content: &[u8]) -> String {
    let mut hasher = DefaultHasher::new();
    content.hash(&mut hasher);
    let v = hasher.finish();
    format!("\"{v:x}\"")
}

/// Check if client's `If-None-Match` header matches the server's `ETag`
///
/// Supports:
/// - Single `ETag`: `"abc123"`
/// - Multiple `ETags`: `"abc123", "def456"`
/// - Weak validators: `W/"abc123"`
/// - Wildcard: `*`
///
/// # Returns
/// Returns true if matched (should return 304), false otherwise
pub fn check_etag_match(if_none_match: Option<&str>, etag: &str) -> bool {
    if_none_match.is_some_and(|client_etag| {
        client_etag.split(',').map(str::trim).any(|e| {
            e == "*" || e.strip_prefix("W/").unwrap_or(e) == etag
        })
    })
}

/// Cache-Control policy for a response
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CachePolicy {
    /// Public cache with specified max-age (seconds)
    Public(u32),
    /// Never store; used for errors so a transient 503 is not pinned at the edge
    NoStore,
}

impl CachePolicy {
    /// Pick the policy for a response.
    ///
    /// Only successful (2xx) and not-modified answers to GET/HEAD are cacheable.
    pub fn for_response(cacheable_method: bool, status: StatusCode, max_age: u32) -> Self {
        if cacheable_method && (status.is_success() || status == StatusCode::NOT_MODIFIED) {
            Self::Public(max_age)
        } else {
            Self::NoStore
        }
    }

    /// Convert to Cache-Control header value
    pub fn to_header_value(self) -> String {
        match self {
            Self::Public(max_age) => format!("public, max-age={max_age}"),
            Self::NoStore => "no-store".to_string(),
        }
    }
}
