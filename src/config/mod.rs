// Configuration module entry point
// Loads layered configuration and owns the shared application state

mod state;
mod types;

use config::builder::DefaultState;
use config::{ConfigBuilder, ConfigError};
use std::net::SocketAddr;

// Re-export public types
pub use state::AppState;
pub use types::{Config, HttpConfig, ProxyConfig};

/// Environment variable prefix, e.g. `PROXY_SERVER__PORT=9000`
const ENV_PREFIX: &str = "PROXY";

impl Config {
    /// Load configuration from specified file path (without extension)
    /// A missing file is not an error; defaults and environment still apply
    pub fn load_from(config_path: &str) -> Result<Self, ConfigError> {
        let settings = Self::builder_with_defaults()?
            .add_source(config::File::with_name(config_path).required(false))
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let cfg: Self = settings.try_deserialize()?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Built-in defaults only, no file or environment
    #[cfg(test)]
    pub fn from_defaults() -> Result<Self, ConfigError> {
        Self::builder_with_defaults()?.build()?.try_deserialize()
    }

    fn builder_with_defaults() -> Result<ConfigBuilder<DefaultState>, ConfigError> {
        config::Config::builder()
            .set_default("server.host", "127.0.0.1")?
            .set_default("server.port", 8787)?
            .set_default("logging.level", "info")?
            .set_default("logging.access_log", true)?
            .set_default("performance.connection_timeout", 60)?
            .set_default("performance.keep_alive", true)?
            .set_default("performance.shutdown_grace_period", 10)?
            .set_default("http.server_name", "ags-tile-proxy")?
            .set_default("http.enable_cors", true)?
            .set_default("http.cache_max_age", 604_800)? // 7 days
            .set_default("http.health_path", "/healthz")?
            .set_default("proxy.timeout_ms", 10_000)?
            .set_default("proxy.pixel_ratio", 1.0)?
            .set_default("proxy.default_params.transparent", "true")?
            .set_default(
                "proxy.user_agent",
                concat!("ags-tile-proxy/", env!("CARGO_PKG_VERSION")),
            )?
            .set_default("proxy.use_system_proxy", true)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if !(self.proxy.pixel_ratio.is_finite() && self.proxy.pixel_ratio > 0.0) {
            return Err(ConfigError::Message(format!(
                "proxy.pixel_ratio must be a positive number, got {}",
                self.proxy.pixel_ratio
            )));
        }
        if self.proxy.timeout_ms == 0 {
            return Err(ConfigError::Message(
                "proxy.timeout_ms must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    pub fn get_socket_addr(&self) -> Result<SocketAddr, String> {
        format!("{}:{}", self.server.host, self.server.port)
            .parse()
            .map_err(|e| format!("Invalid address: {e}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cfg = Config::from_defaults().unwrap();
        assert_eq!(cfg.server.port, 8787);
        assert_eq!(cfg.proxy.timeout_ms, 10_000);
        assert!((cfg.proxy.pixel_ratio - 1.0).abs() < f64::EPSILON);
        assert_eq!(
            cfg.proxy.default_params.get("transparent").map(String::as_str),
            Some("true")
        );
        assert_eq!(cfg.http.cache_max_age, 604_800);
        assert!(cfg.http.enable_cors);
        assert_eq!(cfg.logging.access_log_format, "combined");
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn test_socket_addr() {
        let mut cfg = Config::from_defaults().unwrap();
        assert_eq!(
            cfg.get_socket_addr().unwrap(),
            "127.0.0.1:8787".parse::<SocketAddr>().unwrap()
        );
        cfg.server.host = "not a host".to_string();
        assert!(cfg.get_socket_addr().is_err());
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut cfg = Config::from_defaults().unwrap();
        cfg.proxy.pixel_ratio = 0.0;
        assert!(cfg.validate().is_err());

        let mut cfg = Config::from_defaults().unwrap();
        cfg.proxy.timeout_ms = 0;
        assert!(cfg.validate().is_err());
    }
}
