//! Request handler module
//!
//! Routes requests to the tile proxy, the embedded demo page and the
//! liveness probe.

pub mod assets;
pub mod router;
pub mod tiles;

// Re-export main entry point
pub use router::handle_request;
