//! HTTP protocol layer module
//!
//! Response building, cache validators and content types, decoupled from
//! the tile and asset handlers that use them.

pub mod body;
pub mod cache;
pub mod mime;
pub mod response;

// Re-export commonly used types
pub use body::ProxyBody;
pub use response::{
    build_304_response, build_404_response, build_405_response, build_asset_response,
    build_error_response, build_health_response, build_options_response, build_tile_response,
};
