//! Application configuration loaded from environment variables.

use std::time::Duration;

/// Client configuration with sensible defaults.
///
/// Reads from environment variables:
/// - `BACKEND_URL` — managed backend base URL (default: `"http://localhost:54321"`)
/// - `BACKEND_ANON_KEY` — anonymous API key (default: empty)
/// - `PAYMENT_API_URL` — payment broker base URL (default: `"http://localhost:3000"`)
/// - `DEEP_LINK_SCHEME` — app scheme for payment return links (default: `"solestride"`)
/// - `ORDER_POLL_INTERVAL_SECS` — order list poll interval (default: `30`)
/// - `REQUEST_TIMEOUT_MS` — per-request deadline (default: `10000`)
/// - `DATA_DIR` — directory for persisted local state (default: `".solestride"`)
/// - `RUST_LOG` — tracing filter directive (default: `"info"`)
#[derive(Debug, Clone)]
pub struct Config {
    pub backend_url: String,
    pub backend_anon_key: String,
    pub payment_api_url: String,
    pub deep_link_scheme: String,
    pub poll_interval: Duration,
    pub request_timeout: Duration,
    pub data_dir: String,
    pub log_level: String,
}

impl Config {
    /// Loads configuration from environment variables, falling back to
    /// defaults.
    pub fn from_env() -> Self {
        Self {
            backend_url: std::env::var("BACKEND_URL")
                .unwrap_or_else(|_| "http://localhost:54321".to_string()),
            backend_anon_key: std::env::var("BACKEND_ANON_KEY").unwrap_or_default(),
            payment_api_url: std::env::var("PAYMENT_API_URL")
                .unwrap_or_else(|_| "http://localhost:3000".to_string()),
            deep_link_scheme: std::env::var("DEEP_LINK_SCHEME")
                .unwrap_or_else(|_| "solestride".to_string()),
            poll_interval: Duration::from_secs(
                std::env::var("ORDER_POLL_INTERVAL_SECS")
                    .ok()
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(30),
            ),
            request_timeout: Duration::from_millis(
                std::env::var("REQUEST_TIMEOUT_MS")
                    .ok()
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(10_000),
            ),
            data_dir: std::env::var("DATA_DIR").unwrap_or_else(|_| ".solestride".to_string()),
            log_level: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            backend_url: "http://localhost:54321".to_string(),
            backend_anon_key: String::new(),
            payment_api_url: "http://localhost:3000".to_string(),
            deep_link_scheme: "solestride".to_string(),
            poll_interval: Duration::from_secs(30),
            request_timeout: Duration::from_millis(10_000),
            data_dir: ".solestride".to_string(),
            log_level: "info".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    fn test_default_values() {
        let config = Config::default();
        assert_eq!(config.backend_url, "http://localhost:54321");
        assert_eq!(config.deep_link_scheme, "solestride");
        assert_eq!(config.poll_interval, Duration::from_secs(30));
        assert_eq!(config.request_timeout, Duration::from_millis(10_000));
    }

    #[test]
    #[serial]
    fn test_from_env_overrides() {
        unsafe {
            std::env::set_var("BACKEND_URL", "https://store.example.co");
            std::env::set_var("ORDER_POLL_INTERVAL_SECS", "5");
            std::env::set_var("REQUEST_TIMEOUT_MS", "2500");
        }

        let config = Config::from_env();
        assert_eq!(config.backend_url, "https://store.example.co");
        assert_eq!(config.poll_interval, Duration::from_secs(5));
        assert_eq!(config.request_timeout, Duration::from_millis(2500));

        unsafe {
            std::env::remove_var("BACKEND_URL");
            std::env::remove_var("ORDER_POLL_INTERVAL_SECS");
            std::env::remove_var("REQUEST_TIMEOUT_MS");
        }
    }

    #[test]
    #[serial]
    fn test_from_env_ignores_unparseable_numbers() {
        unsafe {
            std::env::set_var("ORDER_POLL_INTERVAL_SECS", "soon");
        }

        let config = Config::from_env();
        assert_eq!(config.poll_interval, Duration::from_secs(30));

        unsafe {
            std::env::remove_var("ORDER_POLL_INTERVAL_SECS");
        }
    }
}
