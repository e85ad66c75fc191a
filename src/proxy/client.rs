//! Upstream fetch with a header deadline and a streamed body

use crate::config::ProxyConfig;
use crate::http::body::{BoxError, ProxyBody};
use crate::logger;
use futures_util::TryStreamExt;
use http_body_util::{BodyExt, StreamBody};
use hyper::body::Frame;
use hyper::header::{HeaderValue, CONTENT_TYPE};
use hyper::StatusCode;
use std::time::Duration;

use super::ProxyError;

/// A successful upstream answer, not yet read
pub struct UpstreamTile {
    /// Upstream `content-type`, relayed as-is; `None` when upstream sent none
    pub content_type: Option<HeaderValue>,
    /// Upstream `content-length`, when known
    pub content_length: Option<u64>,
    pub body: ProxyBody,
}

/// Build the pooled client used for every upstream request.
///
/// The client has no overall request timeout. [`fetch_tile`] bounds the
/// header phase; the downstream connection lifetime bounds the body.
pub fn build_client(config: &ProxyConfig) -> Result<reqwest::Client, reqwest::Error> {
    let mut builder = reqwest::Client::builder()
        .user_agent(config.user_agent.as_str())
        .connect_timeout(config.timeout());
    if !config.use_system_proxy {
        builder = builder.no_proxy();
    }
    builder.build()
}

/// GET `url` and hand back its body as a stream.
///
/// Fails when the response headers take longer than `deadline`, when the
/// request cannot be made, when the status is anything but 200, or when the
/// response declares an empty body. Dropping the returned body (for instance
/// because the downstream client went away) aborts the upstream transfer.
pub async fn fetch_tile(
    client: &reqwest::Client,
    url: &str,
    deadline: Duration,
) -> Result<UpstreamTile, ProxyError> {
    let response = match tokio::time::timeout(deadline, client.get(url).send()).await {
        Ok(Ok(response)) => response,
        Ok(Err(e)) if e.is_timeout() => return Err(ProxyError::UpstreamTimeout(deadline)),
        Ok(Err(e)) => return Err(ProxyError::UpstreamError(format!("request failed: {e}"))),
        Err(_) => return Err(ProxyError::UpstreamTimeout(deadline)),
    };

    let status = response.status();
    logger::log_upstream_status(status);

    if status != StatusCode::OK {
        return Err(ProxyError::UpstreamError(format!("HTTP {status}")));
    }

    let content_length = response.content_length();
    if content_length == Some(0) {
        return Err(ProxyError::UpstreamError("empty response body".to_string()));
    }

    let content_type = response.headers().get(CONTENT_TYPE).cloned();
    let stream = response
        .bytes_stream()
        .map_ok(Frame::data)
        .map_err(|e| -> BoxError { Box::new(e) });

    Ok(UpstreamTile {
        content_type,
        content_length,
        body: StreamBody::new(stream).boxed_unsync(),
    })
}
