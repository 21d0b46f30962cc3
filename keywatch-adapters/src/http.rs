//! Thin HTTP layer shared by the statistics querier, the keys fetcher and
//! the HTTP notification channels.
//!
//! Everything above this module talks to an [`HttpTransport`], which keeps
//! the adapters testable with in-memory stubs.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use tokio_util::sync::CancellationToken;

use crate::AdapterError;

/// Default timeout applied to every request.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Returns true for 2xx status codes.
pub fn is_http_status_success(status: u16) -> bool {
    (200..300).contains(&status)
}

/// Status code and raw body of a completed exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

impl HttpResponse {
    pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        is_http_status_success(self.status)
    }

    /// Turn a non-2xx response into [`AdapterError::Status`].
    pub fn error_for_status(self) -> Result<Self, AdapterError> {
        if self.is_success() {
            Ok(self)
        } else {
            Err(AdapterError::Status(self.status))
        }
    }
}

/// Issues requests relative to a base URL.
#[async_trait]
pub trait HttpTransport: Send + Sync {
    async fn get(
        &self,
        cancel: &CancellationToken,
        endpoint: &str,
    ) -> Result<HttpResponse, AdapterError>;

    async fn post(
        &self,
        cancel: &CancellationToken,
        endpoint: &str,
        body: Vec<u8>,
    ) -> Result<HttpResponse, AdapterError>;
}

/// [`HttpTransport`] backed by `reqwest`.
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: Client,
    base_url: String,
}

impl HttpClient {
    /// Create a new builder for configuring the client.
    pub fn builder() -> HttpClientBuilder {
        HttpClientBuilder::default()
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn exchange(
        &self,
        cancel: &CancellationToken,
        request: reqwest::RequestBuilder,
    ) -> Result<HttpResponse, AdapterError> {
        let exchange = async {
            let response = request.send().await?;
            let status = response.status().as_u16();
            let body = response.bytes().await?;
            Ok::<_, AdapterError>(HttpResponse::new(status, body.to_vec()))
        };

        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(AdapterError::ContextClosing),
            result = exchange => result,
        }
    }
}

#[async_trait]
impl HttpTransport for HttpClient {
    async fn get(
        &self,
        cancel: &CancellationToken,
        endpoint: &str,
    ) -> Result<HttpResponse, AdapterError> {
        let url = join_endpoint(&self.base_url, endpoint);
        tracing::trace!(%url, "GET");
        self.exchange(cancel, self.client.get(url)).await
    }

    async fn post(
        &self,
        cancel: &CancellationToken,
        endpoint: &str,
        body: Vec<u8>,
    ) -> Result<HttpResponse, AdapterError> {
        let url = join_endpoint(&self.base_url, endpoint);
        tracing::trace!(%url, bytes = body.len(), "POST");
        let request = self
            .client
            .post(url)
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .body(body);
        self.exchange(cancel, request).await
    }
}

/// Builder for HttpClient.
#[derive(Debug, Default)]
pub struct HttpClientBuilder {
    base_url: Option<String>,
    timeout: Option<Duration>,
}

impl HttpClientBuilder {
    /// Set the base URL every endpoint is resolved against.
    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    /// Set the request timeout.
    ///
    /// Default: 30 seconds
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Build the client.
    pub fn build(self) -> Result<HttpClient, AdapterError> {
        let client = Client::builder()
            .timeout(self.timeout.unwrap_or(DEFAULT_REQUEST_TIMEOUT))
            .build()?;

        Ok(HttpClient {
            client,
            base_url: self.base_url.unwrap_or_default(),
        })
    }
}

/// Append `endpoint` to `base` with exactly one slash between them.
/// An empty endpoint addresses the base URL itself.
pub(crate) fn join_endpoint(base: &str, endpoint: &str) -> String {
    if endpoint.is_empty() {
        return base.to_string();
    }
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        endpoint.trim_start_matches('/')
    )
}
