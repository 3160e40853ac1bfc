//! HTTP client factory with consistent timeout configuration.
//!
//! Gateway clients build their `reqwest::Client` here rather than directly so that
//! every outbound call is bounded.

use reqwest::Client;
use std::time::Duration;

/// Default connect timeout (TCP handshake + TLS).
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Build an HTTP client bounded by `request_timeout` (total request/response time).
///
/// The connect timeout never exceeds the request timeout.
pub fn try_build_client(request_timeout: Duration) -> Result<Client, reqwest::Error> {
    Client::builder()
        .connect_timeout(DEFAULT_CONNECT_TIMEOUT.min(request_timeout))
        .timeout(request_timeout)
        .build()
}
