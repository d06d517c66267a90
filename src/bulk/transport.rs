//! HTTP transport underneath the bulk client.
//!
//! The transport owns connectivity concerns only: request signing and retrying
//! attempts that never reached the store. HTTP status codes are returned to
//! the caller untouched.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Method;
use tokio_retry::strategy::ExponentialBackoff;
use tokio_retry::RetryIf;
use url::Url;

use crate::bulk::sigv4::SigV4Signer;
use crate::config::{
    RETRY_FACTOR, RETRY_MAX_DELAY_SECS, TRANSPORT_MAX_ATTEMPTS, TRANSPORT_RETRY_INITIAL_DELAY_MS,
};
use crate::error_handling::TransportError;

/// A fully buffered outbound request.
#[derive(Debug, Clone)]
pub struct HttpRequest {
    /// HTTP method
    pub method: Method,
    /// Target URL
    pub url: Url,
    /// Headers beyond the ones `reqwest` sets
    pub headers: Vec<(String, String)>,
    /// Request body
    pub body: Vec<u8>,
}

impl HttpRequest {
    /// POST request carrying `body` as `content_type`.
    pub fn post(url: Url, content_type: &str, body: impl Into<Vec<u8>>) -> Self {
        HttpRequest {
            method: Method::POST,
            url,
            headers: vec![("content-type".to_string(), content_type.to_string())],
            body: body.into(),
        }
    }

    /// Body as text, for fakes and diagnostics.
    pub fn body_text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

/// A fully buffered response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    /// HTTP status code
    pub status: u16,
    /// Response body
    pub body: String,
}

impl HttpResponse {
    /// 2xx status.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Sends a request and buffers the response.
#[async_trait]
pub trait HttpTransport: Send + Sync {
    /// Sends `request` and returns the response whatever its status.
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError>;
}

/// `reqwest` transport with optional SigV4 signing and connect/timeout retries.
pub struct SignedHttpTransport {
    client: Arc<reqwest::Client>,
    signer: Option<SigV4Signer>,
    max_attempts: usize,
    retry_initial_delay_ms: u64,
}

impl SignedHttpTransport {
    /// Transport over `client`, signing requests when a signer is given.
    pub fn new(client: Arc<reqwest::Client>, signer: Option<SigV4Signer>) -> Self {
        SignedHttpTransport {
            client,
            signer,
            max_attempts: TRANSPORT_MAX_ATTEMPTS,
            retry_initial_delay_ms: TRANSPORT_RETRY_INITIAL_DELAY_MS,
        }
    }

    /// Overrides the attempt budget (at least one attempt is always made).
    pub fn with_retry(mut self, max_attempts: usize, initial_delay_ms: u64) -> Self {
        self.max_attempts = max_attempts.max(1);
        self.retry_initial_delay_ms = initial_delay_ms;
        self
    }

    /// Whether requests are signed.
    pub fn is_signing(&self) -> bool {
        self.signer.is_some()
    }

    async fn send_once(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError> {
        let mut headers = request.headers.clone();
        if let Some(signer) = &self.signer {
            headers.extend(signer.sign(
                request.method.as_str(),
                &request.url,
                &request.body,
                chrono::Utc::now(),
            )?);
        }

        let mut builder = self
            .client
            .request(request.method.clone(), request.url.clone());
        for (name, value) in &headers {
            builder = builder.header(name.as_str(), value.as_str());
        }

        let response = builder.body(request.body.clone()).send().await?;
        let status = response.status().as_u16();
        let body = response.text().await?;
        Ok(HttpResponse { status, body })
    }
}

#[async_trait]
impl HttpTransport for SignedHttpTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        let strategy = ExponentialBackoff::from_millis(self.retry_initial_delay_ms)
            .factor(RETRY_FACTOR)
            .max_delay(Duration::from_secs(RETRY_MAX_DELAY_SECS))
            .take(self.max_attempts.saturating_sub(1));

        let request = &request;
        RetryIf::start(
            strategy,
            || self.send_once(request),
            |error: &TransportError| {
                let retry = error.is_retriable();
                if retry {
                    log::warn!("Retrying {} {}: {}", request.method, request.url, error);
                }
                retry
            },
        )
        .await
    }
}
