//! HTTP client abstraction for testability.
//!
//! Both fetchers go through [`HttpFetch`] so tests can inject canned
//! upstream responses. The production implementation wraps a single
//! keep-alive `reqwest` client; the connection pool is shared across
//! every buoy and forecast request in the process, and building a client
//! per request is prohibited.

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use tracing::{trace, warn};

use crate::error::CoreError;

/// An upstream response: status plus body text.
///
/// Non-2xx statuses are returned as values, not errors; retry and 404
/// policy differ per fetcher, so classification happens at the call site.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    /// HTTP status code.
    pub status: u16,
    /// Response body decoded as UTF-8 text.
    pub body: String,
}

impl HttpResponse {
    /// True for 2xx statuses.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// True for 5xx statuses.
    pub fn is_server_error(&self) -> bool {
        (500..600).contains(&self.status)
    }
}

/// Trait for asynchronous upstream GETs with a per-call timeout.
///
/// Transport-level failures (connect, TLS, body read) surface as
/// `UpstreamUnavailable`; an expired per-call timeout surfaces as
/// `Timeout`.
pub trait HttpFetch: Send + Sync {
    /// Perform a GET against `url`, bounded by `timeout`.
    fn get<'a>(
        &'a self,
        url: &'a str,
        timeout: Duration,
    ) -> Pin<Box<dyn Future<Output = Result<HttpResponse, CoreError>> + Send + 'a>>;
}

/// Production client: one pooled `reqwest::Client` for the whole process.
#[derive(Clone)]
pub struct SharedHttpClient {
    client: reqwest::Client,
}

const USER_AGENT: &str = concat!("seastate/", env!("CARGO_PKG_VERSION"));

impl SharedHttpClient {
    /// Build the shared client.
    ///
    /// # Arguments
    ///
    /// * `pool_idle_timeout` - how long idle keep-alive connections are
    ///   retained (the upstream contract is 60 s)
    pub fn new(pool_idle_timeout: Duration) -> Result<Self, CoreError> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .pool_idle_timeout(pool_idle_timeout)
            .tcp_keepalive(Duration::from_secs(30))
            .build()
            .map_err(|e| CoreError::Config(format!("failed to build HTTP client: {e}")))?;

        Ok(Self { client })
    }
}

impl HttpFetch for SharedHttpClient {
    fn get<'a>(
        &'a self,
        url: &'a str,
        timeout: Duration,
    ) -> Pin<Box<dyn Future<Output = Result<HttpResponse, CoreError>> + Send + 'a>> {
        Box::pin(async move {
            trace!(url, "HTTP GET starting");

            let response = self
                .client
                .get(url)
                .timeout(timeout)
                .send()
                .await
                .map_err(|e| classify_reqwest_error(url, &e))?;

            let status = response.status().as_u16();
            let body = response
                .text()
                .await
                .map_err(|e| classify_reqwest_error(url, &e))?;

            trace!(url, status, bytes = body.len(), "HTTP response received");
            Ok(HttpResponse { status, body })
        })
    }
}

fn classify_reqwest_error(url: &str, err: &reqwest::Error) -> CoreError {
    if err.is_timeout() {
        warn!(url, error = %err, "HTTP request timed out");
        CoreError::Timeout(format!("request to {url} timed out"))
    } else {
        warn!(url, error = %err, "HTTP request failed");
        CoreError::UpstreamUnavailable(format!("request to {url} failed: {err}"))
    }
}
