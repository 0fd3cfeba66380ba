//! HTTP exchange with bounded retries on transient failures.
//!
//! The feed service answers 400 while its backend is briefly unavailable,
//! so a 400 is retried after a fixed back-off, up to
//! [`RetryPolicy::max_attempts`] exchanges in total:
//! - 200 / 201: the response body is returned
//! - 400: back off and retry; past the bound, `TransientFailureExhausted`
//! - anything else: `RequestFailed` immediately
//!
//! The back-off wait races a [`CancellationToken`]; cancelling it aborts the
//! loop with `Cancelled`.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use tokio_util::sync::CancellationToken;

use crate::error::{Result, SheetsError, TransportError};

/// HTTP methods used by the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
    Put,
    Delete,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Delete => "DELETE",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single HTTP request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    pub method: Method,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<Bytes>,
}

impl HttpRequest {
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            headers: Vec::new(),
            body: None,
        }
    }

    pub fn get(url: impl Into<String>) -> Self {
        Self::new(Method::Get, url)
    }

    pub fn post(url: impl Into<String>, body: impl Into<Bytes>) -> Self {
        Self::new(Method::Post, url).with_body(body)
    }

    pub fn delete(url: impl Into<String>) -> Self {
        Self::new(Method::Delete, url)
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// First header with this name (case-insensitive)
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// Status and body of an HTTP response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: Bytes,
}

impl HttpResponse {
    pub fn new(status: u16, body: impl Into<Bytes>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }
}

/// The HTTP capability the client is built on.
///
/// Implementations perform exactly one exchange per call and report
/// failures below HTTP (DNS, TLS, timeouts) as [`TransportError`]; any
/// status code, including errors, is a successful `send`.
#[async_trait]
pub trait HttpClient: Send + Sync {
    async fn send(&self, request: HttpRequest) -> std::result::Result<HttpResponse, TransportError>;
}

#[async_trait]
impl<C: HttpClient + ?Sized> HttpClient for Arc<C> {
    async fn send(&self, request: HttpRequest) -> std::result::Result<HttpResponse, TransportError> {
        (**self).send(request).await
    }
}

/// How often and how patiently transient failures are retried.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total exchanges allowed for one request, first try included. Minimum 1.
    pub max_attempts: u32,
    /// Wait between a transient failure and the next attempt.
    pub backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 61,
            backoff: Duration::from_secs(30),
        }
    }
}

impl RetryPolicy {
    /// A policy that never retries.
    pub fn no_retry() -> Self {
        Self {
            max_attempts: 1,
            backoff: Duration::ZERO,
        }
    }
}

/// Wraps an [`HttpClient`] with the retry policy and a cancellation token.
pub struct RetryingTransport<C> {
    client: C,
    policy: RetryPolicy,
    cancel: CancellationToken,
}

impl<C: HttpClient> RetryingTransport<C> {
    pub fn new(client: C, policy: RetryPolicy) -> Self {
        Self {
            client,
            policy,
            cancel: CancellationToken::new(),
        }
    }

    /// Replace the cancellation token.
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// A handle that aborts any back-off wait when cancelled.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    /// Send a request, retrying transient failures, and return the body.
    pub async fn execute(&self, request: &HttpRequest) -> Result<Bytes> {
        let max_attempts = self.policy.max_attempts.max(1);
        let mut attempt = 1;

        loop {
            if self.cancel.is_cancelled() {
                return Err(SheetsError::Cancelled);
            }

            let response = self.client.send(request.clone()).await?;
            tracing::debug!(
                "{} {} -> {} (attempt {attempt}/{max_attempts})",
                request.method,
                request.url,
                response.status
            );

            match response.status {
                200 | 201 => return Ok(response.body),
                400 if attempt < max_attempts => {
                    tracing::warn!(
                        "Transient failure from {}: {}; retrying in {:?}",
                        request.url,
                        body_text(&response.body),
                        self.policy.backoff
                    );

                    tokio::select! {
                        _ = self.cancel.cancelled() => return Err(SheetsError::Cancelled),
                        _ = tokio::time::sleep(self.policy.backoff) => {}
                    }
                    attempt += 1;
                }
                400 => {
                    return Err(SheetsError::TransientFailureExhausted {
                        attempts: attempt,
                        status: response.status,
                        body: body_text(&response.body),
                    })
                }
                status => {
                    return Err(SheetsError::RequestFailed {
                        status,
                        body: body_text(&response.body),
                    })
                }
            }
        }
    }
}

pub(crate) fn body_text(body: &[u8]) -> String {
    String::from_utf8_lossy(body).into_owned()
}
