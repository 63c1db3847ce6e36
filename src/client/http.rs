//! HTTP client construction from [`Config`]

use crate::config::Config;
use crate::error::{GbufError, Result};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::Client;
use std::time::Duration;

/// Build the underlying HTTP client from configuration.
///
/// - total and connect timeouts from `timeout_secs` / `connect_timeout_secs`
/// - keep-alive and `TCP_NODELAY` (small request/response bodies)
/// - `user_agent` and `default_headers` on every request
///
/// # Errors
///
/// Returns [`GbufError::InvalidConfig`] if a default header is malformed or the
/// client cannot be built.
pub fn create_http_client(config: &Config) -> Result<Client> {
    Client::builder()
        .tcp_keepalive(Duration::from_secs(60))
        .tcp_nodelay(true)
        .pool_idle_timeout(Duration::from_secs(90))
        .timeout(Duration::from_secs(config.timeout_secs))
        .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
        .user_agent(config.user_agent.as_str())
        .default_headers(default_headers(config)?)
        .build()
        .map_err(|e| GbufError::InvalidConfig(format!("Failed to create HTTP client: {e}")))
}

fn default_headers(config: &Config) -> Result<HeaderMap> {
    let mut headers = HeaderMap::with_capacity(config.default_headers.len());
    for (name, value) in &config.default_headers {
        let header_name = HeaderName::from_bytes(name.trim().as_bytes())
            .map_err(|e| GbufError::InvalidConfig(format!("default header name {name:?}: {e}")))?;
        let header_value = HeaderValue::from_str(value)
            .map_err(|e| GbufError::InvalidConfig(format!("default header {name:?}: {e}")))?;
        let _ = headers.insert(header_name, header_value);
    }
    Ok(headers)
}
