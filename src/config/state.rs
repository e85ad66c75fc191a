// Application state module
// Immutable per-process state shared by every connection

use super::types::Config;
use crate::proxy;

/// Application state
pub struct AppState {
    pub config: Config,
    /// Pooled upstream client, cloned cheaply per request
    pub client: reqwest::Client,
}

impl AppState {
    pub fn new(config: Config) -> Result<Self, reqwest::Error> {
        let client = proxy::build_client(&config.proxy)?;
        Ok(Self { config, client })
    }
}
