//! Upstream transports and the invoker that drives them.
//!
//! Two interchangeable implementations sit behind [`Transport`]:
//!
//! - [`HttpClientTransport`]: the primary `reqwest` client
//! - [`RawTransport`]: hand-written HTTP/1.1 over `tokio` sockets and `rustls`
//!
//! [`FallbackTransport`] routes a request to the secondary only when the
//! primary reports [`TransportError::Unavailable`]. Network failures are never
//! retried. Both implementations hand back the same [`UpstreamResponse`]
//! shape, so the choice is invisible past this module.

mod http_client;
mod raw;

pub use http_client::HttpClientTransport;
pub use raw::RawTransport;

use crate::config::{ApiKey, ProviderConfig, TransportKind};
use async_trait::async_trait;
use bytes::Bytes;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};
use url::Url;

/// Header carrying the partner API key.
pub const API_KEY_HEADER: &str = "X-Api-Key";

/// A fully prepared provider call.
#[derive(Debug, Clone)]
pub struct UpstreamRequest {
    pub url: Url,
    pub api_key: ApiKey,
    pub user_agent: String,
    /// Serialized JSON payload.
    pub body: Bytes,
}

impl UpstreamRequest {
    /// A JSON POST to the configured provider endpoint.
    pub fn to_provider(config: &ProviderConfig, body: impl Into<Bytes>) -> Self {
        Self {
            url: config.endpoint.clone(),
            api_key: config.api_key.clone(),
            user_agent: config.user_agent.clone(),
            body: body.into(),
        }
    }
}

/// Status code and raw body, identical for every transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpstreamResponse {
    pub status: u16,
    pub body: Bytes,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    /// Connection refused, DNS failure, TLS handshake failure.
    #[error("connection failed: {0}")]
    Connect(String),
    #[error("request timed out")]
    Timeout,
    /// The transport itself cannot run in this environment.
    #[error("transport unavailable: {0}")]
    Unavailable(String),
    #[error("transport error: {0}")]
    Other(String),
}

#[async_trait]
pub trait Transport: Send + Sync {
    /// Short name for logs.
    fn name(&self) -> &'static str;

    async fn send(&self, request: &UpstreamRequest) -> Result<UpstreamResponse, TransportError>;
}

/// Primary transport with a secondary used only when the primary is unavailable.
pub struct FallbackTransport {
    primary: Arc<dyn Transport>,
    secondary: Arc<dyn Transport>,
}

impl FallbackTransport {
    pub fn new(primary: Arc<dyn Transport>, secondary: Arc<dyn Transport>) -> Self {
        Self { primary, secondary }
    }
}

#[async_trait]
impl Transport for FallbackTransport {
    fn name(&self) -> &'static str {
        "fallback"
    }

    async fn send(&self, request: &UpstreamRequest) -> Result<UpstreamResponse, TransportError> {
        match self.primary.send(request).await {
            Err(TransportError::Unavailable(reason)) => {
                warn!(
                    primary = self.primary.name(),
                    secondary = self.secondary.name(),
                    reason = %reason,
                    "Primary transport unavailable, using secondary"
                );
                self.secondary.send(request).await
            }
            other => other,
        }
    }
}

/// Build the transport stack selected by configuration.
pub fn build_transport(
    kind: TransportKind,
    timeout: Duration,
) -> Result<Arc<dyn Transport>, TransportError> {
    match kind {
        TransportKind::HttpClient => Ok(Arc::new(HttpClientTransport::new(timeout)?)),
        TransportKind::Raw => Ok(Arc::new(RawTransport::new()?)),
        TransportKind::Auto => match (HttpClientTransport::new(timeout), RawTransport::new()) {
            (Ok(primary), Ok(secondary)) => Ok(Arc::new(FallbackTransport::new(
                Arc::new(primary),
                Arc::new(secondary),
            ))),
            (Ok(primary), Err(e)) => {
                warn!(error = %e, "Raw transport unavailable, running without fallback");
                Ok(Arc::new(primary))
            }
            (Err(e), Ok(secondary)) => {
                warn!(error = %e, "HTTP client unavailable, using raw transport");
                Ok(Arc::new(secondary))
            }
            (Err(primary), Err(secondary)) => Err(TransportError::Unavailable(format!(
                "http client: {primary}; raw: {secondary}"
            ))),
        },
    }
}

/// Sends provider requests with a hard upper bound on their duration.
#[derive(Clone)]
pub struct UpstreamInvoker {
    transport: Arc<dyn Transport>,
    timeout: Duration,
}

impl UpstreamInvoker {
    pub fn new(transport: Arc<dyn Transport>, timeout: Duration) -> Self {
        Self { transport, timeout }
    }

    pub fn transport_name(&self) -> &'static str {
        self.transport.name()
    }

    /// Exactly one attempt. Elapsing the bound yields [`TransportError::Timeout`].
    pub async fn invoke(
        &self,
        request: &UpstreamRequest,
    ) -> Result<UpstreamResponse, TransportError> {
        debug!(
            transport = self.transport.name(),
            url = %request.url,
            bytes = request.body.len(),
            "Sending provider request"
        );
        match tokio::time::timeout(self.timeout, self.transport.send(request)).await {
            Ok(result) => result,
            Err(_) => Err(TransportError::Timeout),
        }
    }
}
