//! Upstream ArcGIS access
//!
//! Owns the outbound HTTP client and the single fetch-and-relay operation
//! behind the tile route, plus the error taxonomy callers map onto responses.

mod client;
mod error;

pub use client::{build_client, fetch_tile, UpstreamTile};
pub use error::ProxyError;
