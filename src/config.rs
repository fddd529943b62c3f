//! Server configuration
//!
//! All knobs come from environment variables with sensible defaults so the
//! binary runs out of the box. The mock-data fallback is explicit
//! configuration here rather than hidden session state.

use crate::error::{AppError, Result};
use std::path::PathBuf;

/// Runtime configuration, read once at startup
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind host for the REST API
    pub host: String,
    /// Bind port for the REST API
    pub port: u16,
    /// Directory holding the SQLite database and secrets
    pub data_dir: PathBuf,
    /// Base URL of the live quote upstream, if any
    pub feed_url: Option<String>,
    /// Timeout for a single upstream quote request, in milliseconds
    pub feed_timeout_ms: u64,
    /// Interval between upstream health probes, in seconds
    pub feed_health_interval_secs: u64,
    /// Serve mock quotes only, never contacting the upstream
    pub mock_only: bool,
    /// Rate limits per second: general reads, tariff calculations, auth
    pub general_rate_limit: u32,
    pub calculate_rate_limit: u32,
    pub auth_rate_limit: u32,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8320,
            data_dir: PathBuf::from("./data"),
            feed_url: None,
            feed_timeout_ms: 2_000,
            feed_health_interval_secs: 30,
            mock_only: false,
            general_rate_limit: 100,
            calculate_rate_limit: 20,
            auth_rate_limit: 5,
        }
    }
}

impl ServerConfig {
    /// Load configuration from `TRADEEASY_*` environment variables
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();

        let port = match std::env::var("TRADEEASY_PORT") {
            Ok(v) => v
                .parse()
                .map_err(|_| AppError::Config(format!("Invalid TRADEEASY_PORT: {}", v)))?,
            Err(_) => defaults.port,
        };

        let feed_timeout_ms = match std::env::var("TRADEEASY_FEED_TIMEOUT_MS") {
            Ok(v) => v.parse().map_err(|_| {
                AppError::Config(format!("Invalid TRADEEASY_FEED_TIMEOUT_MS: {}", v))
            })?,
            Err(_) => defaults.feed_timeout_ms,
        };

        let feed_health_interval_secs = match std::env::var("TRADEEASY_FEED_HEALTH_INTERVAL_SECS")
        {
            Ok(v) => v.parse().map_err(|_| {
                AppError::Config(format!("Invalid TRADEEASY_FEED_HEALTH_INTERVAL_SECS: {}", v))
            })?,
            Err(_) => defaults.feed_health_interval_secs,
        };

        Ok(Self {
            host: std::env::var("TRADEEASY_HOST").unwrap_or(defaults.host),
            port,
            data_dir: std::env::var("TRADEEASY_DATA_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.data_dir),
            feed_url: std::env::var("TRADEEASY_FEED_URL").ok(),
            feed_timeout_ms,
            feed_health_interval_secs,
            mock_only: std::env::var("TRADEEASY_MOCK_ONLY")
                .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
                .unwrap_or(defaults.mock_only),
            general_rate_limit: defaults.general_rate_limit,
            calculate_rate_limit: defaults.calculate_rate_limit,
            auth_rate_limit: defaults.auth_rate_limit,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ServerConfig::default();
        assert_eq!(config.port, 8320);
        assert!(!config.mock_only);
        assert!(config.feed_url.is_none());
        assert!(config.general_rate_limit > config.auth_rate_limit);
    }
}
