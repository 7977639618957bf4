//! Shared outbound HTTP client.
//!
//! One `reqwest::Client` is built at startup and handed to every adapter;
//! reqwest keeps keep-alive pools per remote origin, so all vendors and
//! organizations share the same bounded pool safely under concurrent access.

use crate::{Error, Result};
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct HttpClientConfig {
    /// Per-request timeout; there is no separate per-sync deadline, so a
    /// hung vendor call can only time out here.
    pub request_timeout: Duration,
    pub pool_idle_timeout: Duration,
    pub pool_max_idle_per_host: usize,
    pub tcp_keepalive: Duration,
}

impl Default for HttpClientConfig {
    fn default() -> Self {
        Self {
            request_timeout: Duration::from_secs(30),
            pool_idle_timeout: Duration::from_secs(90),
            pool_max_idle_per_host: 8,
            tcp_keepalive: Duration::from_secs(60),
        }
    }
}

/// Build the shared client. `reqwest::Client` is internally reference-counted;
/// clones are cheap and reuse the same pools.
pub fn build_client(config: &HttpClientConfig) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(config.request_timeout)
        .pool_idle_timeout(config.pool_idle_timeout)
        .pool_max_idle_per_host(config.pool_max_idle_per_host)
        .tcp_keepalive(config.tcp_keepalive)
        .build()
        .map_err(|e| Error::backend("build http client", e))
}
