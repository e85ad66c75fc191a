// Configuration types module
// Defines all configuration-related data structures

use serde::Deserialize;
use std::collections::BTreeMap;
use std::time::Duration;

/// Main configuration structure
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub logging: LoggingConfig,
    pub performance: PerformanceConfig,
    pub http: HttpConfig,
    pub proxy: ProxyConfig,
}

/// Listener configuration
#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Tokio worker threads (defaults to CPU cores)
    #[serde(default)]
    pub workers: Option<usize>,
}

/// Logging configuration
#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    pub level: String,
    pub access_log: bool,
    /// Access log format (combined, common, json, or custom pattern)
    #[serde(default = "default_access_log_format")]
    pub access_log_format: String,
    /// Access log file path (optional, stdout if not set)
    #[serde(default)]
    pub access_log_file: Option<String>,
    /// Error log file path (optional, stderr if not set)
    #[serde(default)]
    pub error_log_file: Option<String>,
}

#[allow(clippy::missing_const_for_fn)]
fn default_access_log_format() -> String {
    "combined".to_string()
}

/// Connection handling configuration
#[derive(Debug, Deserialize, Clone)]
pub struct PerformanceConfig {
    /// Upper bound on a single connection's lifetime, in seconds
    pub connection_timeout: u64,
    pub keep_alive: bool,
    #[serde(default)]
    pub max_connections: Option<u64>,
    /// Seconds to wait for in-flight connections on shutdown
    pub shutdown_grace_period: u64,
}

impl PerformanceConfig {
    pub const fn connection_timeout(&self) -> Duration {
        Duration::from_secs(self.connection_timeout)
    }

    pub const fn shutdown_grace_period(&self) -> Duration {
        Duration::from_secs(self.shutdown_grace_period)
    }
}

/// Response header configuration
#[derive(Debug, Deserialize, Clone)]
pub struct HttpConfig {
    pub server_name: String,
    pub enable_cors: bool,
    /// `max-age` of the public Cache-Control directive, in seconds
    pub cache_max_age: u32,
    /// Liveness probe path, empty to disable
    pub health_path: String,
}

/// Upstream ArcGIS request configuration
#[derive(Debug, Deserialize, Clone)]
pub struct ProxyConfig {
    /// Deadline for the upstream response headers, in milliseconds
    pub timeout_ms: u64,
    pub pixel_ratio: f64,
    /// Export parameters applied before the caller's own
    #[serde(default)]
    pub default_params: BTreeMap<String, String>,
    pub user_agent: String,
    /// Honor `HTTP_PROXY`/`HTTPS_PROXY` from the environment
    pub use_system_proxy: bool,
}

impl ProxyConfig {
    pub const fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}
