//! Tile proxy error taxonomy

use hyper::StatusCode;
use std::time::Duration;
use thiserror::Error;

/// Every way a tile request can fail. All of them end the request.
#[derive(Debug, Error)]
pub enum ProxyError {
    #[error("invalid tile address: {0}")]
    InvalidTileAddress(String),

    #[error("missing url parameter")]
    MissingUpstreamUrl,

    #[error("upstream did not respond within {}ms", .0.as_millis())]
    UpstreamTimeout(Duration),

    #[error("upstream error: {0}")]
    UpstreamError(String),
}

impl ProxyError {
    /// Status returned to the caller
    ///
    /// Timeouts share 503 with other upstream failures so clients see one
    /// failure mode for "the map server could not render this tile".
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::InvalidTileAddress(_) | Self::MissingUpstreamUrl => StatusCode::BAD_REQUEST,
            Self::UpstreamTimeout(_) | Self::UpstreamError(_) => StatusCode::SERVICE_UNAVAILABLE,
        }
    }

    /// Plain-text body returned to the caller
    pub const fn public_message(&self) -> &'static str {
        match self {
            Self::InvalidTileAddress(_) => "Invalid tile address",
            Self::MissingUpstreamUrl => "Missing url parameter",
            Self::UpstreamTimeout(_) | Self::UpstreamError(_) => "Error from proxied server",
        }
    }
}
