//! Embedded demo page
//!
//! The page, its stylesheet and its script are compiled into the binary and
//! served verbatim with a content-hash `ETag`.

use crate::handler::router::RequestContext;
use crate::http::{self, cache, mime, ProxyBody};
use hyper::Response;
use std::sync::OnceLock;

const INDEX_HTML: &str = include_str!("../../static/index.html");
const APP_CSS: &str = include_str!("../../static/app.css");
const APP_JS: &str = include_str!("../../static/app.js");

struct Asset {
    name: &'static str,
    data: &'static str,
    etag: String,
}

impl Asset {
    fn new(name: &'static str, data: &'static str) -> Self {
        Self {
            name,
            data,
            etag: cache::generate_etag(data.as_bytes()),
        }
    }
}

static ASSETS: OnceLock<[Asset; 3]> = OnceLock::new();

fn assets() -> &'static [Asset; 3] {
    ASSETS.get_or_init(|| {
        [
            Asset::new("index.html", INDEX_HTML),
            Asset::new("app.css", APP_CSS),
            Asset::new("app.js", APP_JS),
        ]
    })
}

fn lookup(path: &str) -> Option<&'static Asset> {
    let name = match path {
        "/" => "index.html",
        "/app.css" => "app.css",
        "/app.js" => "app.js",
        _ => return None,
    };
    assets().iter().find(|asset| asset.name == name)
}

/// Serve an embedded asset, or `None` when the path names none
pub fn serve_asset(ctx: &RequestContext<'_>) -> Option<Response<ProxyBody>> {
    let asset = lookup(ctx.path)?;

    if cache::check_etag_match(ctx.if_none_match, &asset.etag) {
        return Some(http::build_304_response(&asset.etag));
    }

    Some(http::build_asset_response(
        asset.data,
        mime::content_type_for(asset.name),
        &asset.etag,
        ctx.is_head,
    ))
}
