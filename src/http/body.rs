//! Response body type
//!
//! Static assets and error pages are buffered, proxied tiles are streamed;
//! both are boxed into one type so every handler returns the same response.

use http_body_util::combinators::UnsyncBoxBody;
use http_body_util::{BodyExt, Empty, Full};
use hyper::body::Bytes;

pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Body of every response this server produces
pub type ProxyBody = UnsyncBoxBody<Bytes, BoxError>;

/// Buffered body
pub fn full(data: impl Into<Bytes>) -> ProxyBody {
    Full::new(data.into())
        .map_err(|never| match never {})
        .boxed_unsync()
}

/// Zero-length body
pub fn empty() -> ProxyBody {
    Empty::<Bytes>::new()
        .map_err(|never| match never {})
        .boxed_unsync()
}
