//! Outbound HTTP clients.
//!
//! None of the clients follow redirects: the OAuth token exchange requires
//! it, and backend redirects must reach the browser untouched.

use crate::error::ConfigError;
use std::time::Duration;

/// Time allowed to establish a connection.
pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

/// How long an idle pooled connection is kept.
pub const POOL_IDLE_TIMEOUT: Duration = Duration::from_secs(30);

/// TCP keepalive interval.
pub const TCP_KEEPALIVE: Duration = Duration::from_secs(30);

fn builder() -> reqwest::ClientBuilder {
    reqwest::Client::builder()
        .redirect(reqwest::redirect::Policy::none())
        .connect_timeout(CONNECT_TIMEOUT)
        .pool_idle_timeout(POOL_IDLE_TIMEOUT)
        .tcp_keepalive(TCP_KEEPALIVE)
}

/// Client for identity-provider calls: token exchange, profile and member
/// lookups. Every request is bounded by `request_timeout`.
///
/// # Errors
///
/// Returns an error if the TLS backend cannot be initialized.
pub fn identity_client(request_timeout: Duration) -> Result<reqwest::Client, ConfigError> {
    builder()
        .timeout(request_timeout)
        .build()
        .map_err(|e| ConfigError::HttpClient {
            details: e.to_string(),
        })
}

/// Client for the protected backend.
///
/// No overall timeout, so long-lived streaming responses are not cut off.
///
/// # Errors
///
/// Returns an error if the TLS backend cannot be initialized.
pub fn backend_client() -> Result<reqwest::Client, ConfigError> {
    builder().build().map_err(|e| ConfigError::HttpClient {
        details: e.to_string(),
    })
}
