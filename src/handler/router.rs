//! Request routing dispatch module
//!
//! Entry point for HTTP request processing, responsible for method validation,
//! route matching, dispatching and the headers every response carries.

use crate::config::{AppState, HttpConfig};
use crate::handler::{assets, tiles};
use crate::http::{self, cache::CachePolicy, ProxyBody};
use crate::logger::{self, AccessLogEntry};
use hyper::body::Body;
use hyper::header::{
    HeaderValue, ACCESS_CONTROL_ALLOW_ORIGIN, CACHE_CONTROL, IF_NONE_MATCH, SERVER,
};
use hyper::{Method, Request, Response};
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

const TILES_PREFIX: &str = "/tiles/";
const FAVICON_PATH: &str = "/favicon.ico";

/// Request context encapsulating information needed for request processing
pub struct RequestContext<'a> {
    pub path: &'a str,
    /// Raw query string, still percent-encoded
    pub query: Option<&'a str>,
    pub is_head: bool,
    pub if_none_match: Option<&'a str>,
}

/// Main entry point for HTTP request handling
///
/// The request body is never read; every route is GET/HEAD.
pub async fn handle_request<B>(
    req: Request<B>,
    state: Arc<AppState>,
    remote_addr: SocketAddr,
) -> Result<Response<ProxyBody>, Infallible> {
    let started = Instant::now();
    let access_entry = state
        .config
        .logging
        .access_log
        .then(|| AccessLogEntry::from_request(remote_addr, &req));

    let (parts, _) = req.into_parts();
    let http_config = &state.config.http;

    // 1. Check HTTP method
    let mut response = match check_http_method(&parts.method, http_config.enable_cors) {
        Some(resp) => resp,
        None => {
            // 2. Dispatch
            let ctx = RequestContext {
                path: parts.uri.path(),
                query: parts.uri.query(),
                is_head: parts.method == Method::HEAD,
                if_none_match: parts
                    .headers
                    .get(IF_NONE_MATCH)
                    .and_then(|v| v.to_str().ok()),
            };
            route_request(&ctx, &state).await
        }
    };

    let cacheable_method = matches!(parts.method, Method::GET | Method::HEAD);
    apply_common_headers(&mut response, http_config, cacheable_method);

    if let Some(mut entry) = access_entry {
        entry.complete(
            response.status().as_u16(),
            response.body().size_hint().exact(),
            started.elapsed(),
        );
        logger::log_access(&entry, &state.config.logging.access_log_format);
    }

    Ok(response)
}

/// Check HTTP method and return appropriate response for non-GET/HEAD methods
fn check_http_method(method: &Method, enable_cors: bool) -> Option<Response<ProxyBody>> {
    match *method {
        Method::GET | Method::HEAD => None,
        Method::OPTIONS => Some(http::build_options_response(enable_cors)),
        _ => {
            logger::log_warning(&format!("Method not allowed: {method}"));
            Some(http::build_405_response())
        }
    }
}

/// Route request based on path
async fn route_request(ctx: &RequestContext<'_>, state: &AppState) -> Response<ProxyBody> {
    // 1. Tiles
    if let Some(rest) = ctx.path.strip_prefix(TILES_PREFIX) {
        return match tile_segments(rest) {
            Some(segments) => tiles::serve_tile(ctx, segments, state).await,
            None => http::build_404_response(),
        };
    }

    // 2. No favicon
    if ctx.path == FAVICON_PATH {
        return http::build_404_response();
    }

    // 3. Liveness probe
    let health_path = state.config.http.health_path.as_str();
    if !health_path.is_empty() && ctx.path == health_path {
        return http::build_health_response();
    }

    // 4. Demo page
    assets::serve_asset(ctx).unwrap_or_else(http::build_404_response)
}

/// Split `{zoom}/{x}/{y}`; any other segment count is not a tile route
fn tile_segments(rest: &str) -> Option<tiles::TileSegments<'_>> {
    let mut segments = rest.split('/');
    match (segments.next(), segments.next(), segments.next(), segments.next()) {
        (Some(zoom), Some(x), Some(y), None) => Some((zoom, x, y)),
        _ => None,
    }
}

/// Add `Server`, CORS and Cache-Control headers
fn apply_common_headers(
    response: &mut Response<ProxyBody>,
    http_config: &HttpConfig,
    cacheable_method: bool,
) {
    let policy = CachePolicy::for_response(
        cacheable_method,
        response.status(),
        http_config.cache_max_age,
    );
    let headers = response.headers_mut();

    if !http_config.server_name.is_empty() {
        if let Ok(value) = HeaderValue::from_str(&http_config.server_name) {
            headers.insert(SERVER, value);
        }
    }
    if http_config.enable_cors {
        headers.insert(ACCESS_CONTROL_ALLOW_ORIGIN, HeaderValue::from_static("*"));
    }
    if let Ok(value) = HeaderValue::from_str(&policy.to_header_value()) {
        headers.insert(CACHE_CONTROL, value);
    }
}
