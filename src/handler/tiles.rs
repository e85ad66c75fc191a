//! Tile proxy handler
//!
//! Turns `/tiles/{zoom}/{x}/{y}?url=...` into an ArcGIS `export` request and
//! streams the rendered image back.

use crate::config::AppState;
use crate::handler::router::RequestContext;
use crate::http::{self, ProxyBody};
use crate::logger;
use crate::proxy::{self, ProxyError, UpstreamTile};
use crate::tile::{ExportRequest, TileAddress};
use hyper::Response;
use url::form_urlencoded;

/// Query parameter naming the MapServer endpoint
const UPSTREAM_URL_PARAM: &str = "url";

/// Raw `{zoom}`, `{x}` and `{y}` path segments
pub type TileSegments<'a> = (&'a str, &'a str, &'a str);

/// Proxy one tile request
pub async fn serve_tile(
    ctx: &RequestContext<'_>,
    segments: TileSegments<'_>,
    state: &AppState,
) -> Response<ProxyBody> {
    match proxy_tile(ctx, segments, state).await {
        Ok(tile) => http::build_tile_response(tile, ctx.is_head),
        Err(err) => {
            logger::log_warning(&format!("Tile request {} failed: {err}", ctx.path));
            http::build_error_response(&err)
        }
    }
}

async fn proxy_tile(
    ctx: &RequestContext<'_>,
    (zoom, x, y): TileSegments<'_>,
    state: &AppState,
) -> Result<UpstreamTile, ProxyError> {
    let (ags_url, params) = split_query(ctx.query)?;
    let tile = TileAddress::parse(zoom, x, y)?;

    let proxy_config = &state.config.proxy;
    let url = ExportRequest::new(&ags_url, proxy_config.pixel_ratio)
        .with_defaults(&proxy_config.default_params)
        .with_params(params)
        .tile_url(&tile);
    logger::log_upstream_request(&tile, &url);

    proxy::fetch_tile(&state.client, &url, proxy_config.timeout()).await
}

/// Separate the upstream URL from the export parameters to forward.
///
/// Values are percent-decoded once. The first `url` wins; an empty one
/// counts as missing.
fn split_query(query: Option<&str>) -> Result<(String, Vec<(String, String)>), ProxyError> {
    let mut ags_url = None;
    let mut params = Vec::new();

    for (key, value) in form_urlencoded::parse(query.unwrap_or_default().as_bytes()) {
        if key == UPSTREAM_URL_PARAM {
            if ags_url.is_none() {
                ags_url = Some(value.into_owned());
            }
        } else {
            params.push((key.into_owned(), value.into_owned()));
        }
    }

    match ags_url {
        Some(url) if !url.is_empty() => Ok((url, params)),
        _ => Err(ProxyError::MissingUpstreamUrl),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::handler::handle_request;
    use http_body_util::{BodyExt, Full};
    use hyper::body::{Bytes, Incoming};
    use hyper::header::CONTENT_TYPE;
    use hyper::server::conn::http1;
    use hyper::service::service_fn;
    use hyper::{Request, StatusCode};
    use hyper_util::rt::TokioIo;
    use std::convert::Infallible;
    use std::net::SocketAddr;
    use std::sync::{Arc, Mutex};
    use std::time::{Duration, Instant};
    use tokio::net::TcpListener;

    const PNG_BYTES: &[u8] = b"\x89PNG\r\n\x1a\nfake tile";

    /// What the stub MapServer answers to every request
    #[derive(Clone, Copy)]
    struct StubReply {
        status: u16,
        content_type: Option<&'static str>,
        body: &'static [u8],
        delay: Duration,
    }

    impl StubReply {
        const fn png() -> Self {
            Self {
                status: 200,
                content_type: Some("image/png"),
                body: PNG_BYTES,
                delay: Duration::ZERO,
            }
        }
    }

    /// Start a stub upstream; returns its address and the request URIs it saw
    async fn spawn_upstream(reply: StubReply) -> (SocketAddr, Arc<Mutex<Vec<String>>>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let record = Arc::clone(&seen);

        tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                let record = Arc::clone(&record);
                tokio::spawn(async move {
                    let service = service_fn(move |req: Request<Incoming>| {
                        let record = Arc::clone(&record);
                        async move {
                            record.lock().unwrap().push(req.uri().to_string());
                            tokio::time::sleep(reply.delay).await;
                            let mut builder = hyper::Response::builder().status(reply.status);
                            if let Some(content_type) = reply.content_type {
                                builder = builder.header(CONTENT_TYPE, content_type);
                            }
                            Ok::<_, Infallible>(
                                builder.body(Full::new(Bytes::from_static(reply.body))).unwrap(),
                            )
                        }
                    });
                    let _ = http1::Builder::new()
                        .serve_connection(TokioIo::new(stream), service)
                        .await;
                });
            }
        });

        (addr, seen)
    }

    fn test_state(timeout_ms: u64) -> Arc<AppState> {
        let mut config = Config::from_defaults().unwrap();
        config.proxy.timeout_ms = timeout_ms;
        config.proxy.use_system_proxy = false;
        config.logging.access_log = false;
        Arc::new(AppState::new(config).unwrap())
    }

    fn tile_request(path: &str, upstream: SocketAddr, extra: &[(&str, &str)]) -> Request<()> {
        let query = form_urlencoded::Serializer::new(String::new())
            .append_pair("url", &format!("http://{upstream}/MapServer"))
            .extend_pairs(extra)
            .finish();
        Request::builder()
            .uri(format!("{path}?{query}"))
            .body(())
            .unwrap()
    }

    async fn send(req: Request<()>, state: &Arc<AppState>) -> (StatusCode, Option<String>, Bytes) {
        let response = handle_request(req, Arc::clone(state), "127.0.0.1:50000".parse().unwrap())
            .await
            .unwrap();
        let status = response.status();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .map(|v| v.to_str().unwrap().to_string());
        let body = response.into_body().collect().await.unwrap().to_bytes();
        (status, content_type, body)
    }

    #[test]
    fn test_split_query() {
        let (url, params) =
            split_query(Some("url=https%3A%2F%2Fh%2FMapServer&layers=show%3A14&url=ignored"))
                .unwrap();
        assert_eq!(url, "https://h/MapServer");
        assert_eq!(params, vec![("layers".to_string(), "show:14".to_string())]);
    }

    #[test]
    fn test_split_query_missing_url() {
        assert!(matches!(split_query(None), Err(ProxyError::MissingUpstreamUrl)));
        assert!(matches!(
            split_query(Some("layers=show%3A14")),
            Err(ProxyError::MissingUpstreamUrl)
        ));
        assert!(matches!(
            split_query(Some("url=&layers=1")),
            Err(ProxyError::MissingUpstreamUrl)
        ));
    }

    #[tokio::test]
    async fn test_relays_png_tile() {
        let (upstream, _) = spawn_upstream(StubReply::png()).await;
        let state = test_state(2_000);

        let (status, content_type, body) =
            send(tile_request("/tiles/3/2/1", upstream, &[]), &state).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(content_type.as_deref(), Some("image/png"));
        assert_eq!(&body[..], PNG_BYTES);
    }

    #[tokio::test]
    async fn test_builds_export_url() {
        let (upstream, seen) = spawn_upstream(StubReply::png()).await;
        let state = test_state(2_000);

        let req = tile_request("/tiles/0/0/0", upstream, &[("layers", "show:14")]);
        let (status, _, _) = send(req, &state).await;
        assert_eq!(status, StatusCode::OK);

        let seen = seen.lock().unwrap();
        assert_eq!(
            seen.as_slice(),
            ["/MapServer/export?bbox=-20037508.3427892,-20037508.3427892,20037508.3427892,20037508.3427892\
              &bboxSR=3857&imageSR=3857&size=256,256&f=image&layers=show%3A14&transparent=true"]
        );
    }

    #[tokio::test]
    async fn test_caller_overrides_default_param() {
        let (upstream, seen) = spawn_upstream(StubReply::png()).await;
        let state = test_state(2_000);

        let req = tile_request("/tiles/1/0/1", upstream, &[("transparent", "false")]);
        send(req, &state).await;

        let seen = seen.lock().unwrap();
        assert!(seen[0].ends_with("&f=image&transparent=false"));
    }

    #[tokio::test]
    async fn test_upstream_error_status() {
        let (upstream, _) = spawn_upstream(StubReply {
            status: 500,
            content_type: Some("text/html"),
            body: b"<h1>boom</h1>",
            delay: Duration::ZERO,
        })
        .await;
        let state = test_state(2_000);

        let (status, _, body) = send(tile_request("/tiles/4/3/2", upstream, &[]), &state).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(&body[..], b"Error from proxied server");
    }

    #[tokio::test]
    async fn test_empty_upstream_body() {
        let (upstream, _) = spawn_upstream(StubReply {
            body: b"",
            ..StubReply::png()
        })
        .await;
        let state = test_state(2_000);

        let (status, _, _) = send(tile_request("/tiles/4/3/2", upstream, &[]), &state).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn test_upstream_timeout() {
        let (upstream, _) = spawn_upstream(StubReply {
            delay: Duration::from_secs(5),
            ..StubReply::png()
        })
        .await;
        let state = test_state(200);

        let started = Instant::now();
        let (status, _, body) = send(tile_request("/tiles/4/3/2", upstream, &[]), &state).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(&body[..], b"Error from proxied server");
        assert!(started.elapsed() < Duration::from_secs(2));
    }

    #[tokio::test]
    async fn test_upstream_unreachable() {
        // Bind then drop to get a port nobody listens on
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let upstream = listener.local_addr().unwrap();
        drop(listener);
        let state = test_state(2_000);

        let (status, _, _) = send(tile_request("/tiles/4/3/2", upstream, &[]), &state).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn test_missing_content_type_is_not_invented() {
        let (upstream, _) = spawn_upstream(StubReply {
            content_type: None,
            ..StubReply::png()
        })
        .await;
        let state = test_state(2_000);

        let (status, content_type, body) =
            send(tile_request("/tiles/4/3/2", upstream, &[]), &state).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(content_type, None);
        assert_eq!(&body[..], PNG_BYTES);
    }

    #[tokio::test]
    async fn test_repeated_requests_match() {
        let (upstream, seen) = spawn_upstream(StubReply::png()).await;
        let state = test_state(2_000);

        let first = send(tile_request("/tiles/5/9/12.png", upstream, &[]), &state).await;
        let second = send(tile_request("/tiles/5/9/12.png", upstream, &[]), &state).await;
        assert_eq!(first, second);

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 2);
        assert_eq!(seen[0], seen[1]);
    }

    #[tokio::test]
    async fn test_invalid_address_never_reaches_upstream() {
        let (upstream, seen) = spawn_upstream(StubReply::png()).await;
        let state = test_state(2_000);

        let (status, _, body) = send(tile_request("/tiles/a/3/2", upstream, &[]), &state).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(&body[..], b"Invalid tile address");
        assert!(seen.lock().unwrap().is_empty());
    }
}
