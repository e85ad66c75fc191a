//! HTTP response building module
//!
//! Provides builders for the responses the proxy produces, decoupled from
//! the handlers that decide which one to send.

use hyper::body::Bytes;
use hyper::header::{
    HeaderValue, ACCESS_CONTROL_ALLOW_HEADERS, ACCESS_CONTROL_ALLOW_METHODS,
    ACCESS_CONTROL_MAX_AGE, ALLOW, CONTENT_LENGTH, CONTENT_TYPE, ETAG,
};
use hyper::{Response, StatusCode};

use super::body::{self, ProxyBody};
use crate::proxy::{ProxyError, UpstreamTile};

const TEXT_PLAIN: &str = "text/plain; charset=utf-8";
const ALLOWED_METHODS: &str = "GET, HEAD, OPTIONS";

/// Build a short plain-text response
fn build_text_response(status: StatusCode, message: &'static str) -> Response<ProxyBody> {
    Response::builder()
        .status(status)
        .header(CONTENT_TYPE, TEXT_PLAIN)
        .body(body::full(message))
        .unwrap_or_else(|e| {
            log_build_error(status.as_str(), &e);
            Response::new(body::full(message))
        })
}

/// Build 304 Not Modified response
pub fn build_304_response(etag: &str) -> Response<ProxyBody> {
    Response::builder()
        .status(StatusCode::NOT_MODIFIED)
        .header(ETAG, etag)
        .body(body::empty())
        .unwrap_or_else(|e| {
            log_build_error("304", &e);
            Response::new(body::empty())
        })
}

/// Build 404 Not Found response
pub fn build_404_response() -> Response<ProxyBody> {
    build_text_response(StatusCode::NOT_FOUND, "404 Not Found")
}

/// Build 405 Method Not Allowed response
pub fn build_405_response() -> Response<ProxyBody> {
    let mut response = build_text_response(StatusCode::METHOD_NOT_ALLOWED, "405 Method Not Allowed");
    response
        .headers_mut()
        .insert(ALLOW, HeaderValue::from_static(ALLOWED_METHODS));
    response
}

/// Build OPTIONS response (preflight request)
pub fn build_options_response(enable_cors: bool) -> Response<ProxyBody> {
    let mut builder = Response::builder()
        .status(StatusCode::NO_CONTENT)
        .header(ALLOW, ALLOWED_METHODS);

    if enable_cors {
        builder = builder
            .header(ACCESS_CONTROL_ALLOW_METHODS, ALLOWED_METHODS)
            .header(ACCESS_CONTROL_ALLOW_HEADERS, "*")
            .header(ACCESS_CONTROL_MAX_AGE, "86400");
    }

    builder.body(body::empty()).unwrap_or_else(|e| {
        log_build_error("OPTIONS", &e);
        Response::new(body::empty())
    })
}

/// Build liveness probe response
pub fn build_health_response() -> Response<ProxyBody> {
    build_text_response(StatusCode::OK, "ok")
}

/// Build the response for a failed tile request
pub fn build_error_response(err: &ProxyError) -> Response<ProxyBody> {
    build_text_response(err.status(), err.public_message())
}

/// Build an embedded asset response with its validator
pub fn build_asset_response(
    data: &'static str,
    content_type: &str,
    etag: &str,
    is_head: bool,
) -> Response<ProxyBody> {
    let payload = if is_head {
        body::empty()
    } else {
        body::full(Bytes::from_static(data.as_bytes()))
    };

    Response::builder()
        .status(StatusCode::OK)
        .header(CONTENT_TYPE, content_type)
        .header(CONTENT_LENGTH, data.len())
        .header(ETAG, etag)
        .body(payload)
        .unwrap_or_else(|e| {
            log_build_error("200", &e);
            Response::new(body::empty())
        })
}

/// Relay a successful upstream tile.
///
/// The upstream `content-type` is copied verbatim and omitted when upstream
/// sent none; no default is substituted.
pub fn build_tile_response(tile: UpstreamTile, is_head: bool) -> Response<ProxyBody> {
    let UpstreamTile {
        content_type,
        content_length,
        body: upstream_body,
    } = tile;

    let payload = if is_head {
        // Dropping the stream closes the upstream transfer
        drop(upstream_body);
        body::empty()
    } else {
        upstream_body
    };

    let mut builder = Response::builder().status(StatusCode::OK);
    if let Some(content_type) = content_type {
        builder = builder.header(CONTENT_TYPE, content_type);
    }
    if let Some(length) = content_length.filter(|_| is_head) {
        builder = builder.header(CONTENT_LENGTH, length);
    }

    builder.body(payload).unwrap_or_else(|e| {
        log_build_error("tile", &e);
        Response::new(body::empty())
    })
}

/// Log response build error
fn log_build_error(status: &str, error: &hyper::http::Error) {
    crate::logger::log_error(&format!("Failed to build {status} response: {error}"));
}
