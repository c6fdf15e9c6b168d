//! Primary transport backed by `reqwest`.

use super::{API_KEY_HEADER, Transport, TransportError, UpstreamRequest, UpstreamResponse};
use async_trait::async_trait;
use reqwest::header::{ACCEPT, CONTENT_TYPE, USER_AGENT};
use std::time::Duration;

pub struct HttpClientTransport {
    client: reqwest::Client,
}

impl HttpClientTransport {
    /// Build the client. Fails only when the environment cannot provide
    /// one (e.g. the TLS backend cannot initialise).
    pub fn new(timeout: Duration) -> Result<Self, TransportError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            // The raw transport does not follow redirects either.
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .map_err(|e| TransportError::Unavailable(e.to_string()))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl Transport for HttpClientTransport {
    fn name(&self) -> &'static str {
        "http_client"
    }

    async fn send(&self, request: &UpstreamRequest) -> Result<UpstreamResponse, TransportError> {
        let response = self
            .client
            .post(request.url.clone())
            .header(API_KEY_HEADER, request.api_key.expose())
            .header(CONTENT_TYPE, "application/json")
            .header(ACCEPT, "application/json")
            .header(USER_AGENT, &request.user_agent)
            .body(request.body.clone())
            .send()
            .await
            .map_err(classify)?;

        let status = response.status().as_u16();
        let body = response.bytes().await.map_err(classify)?;

        Ok(UpstreamResponse { status, body })
    }
}

fn classify(err: reqwest::Error) -> TransportError {
    if err.is_timeout() {
        TransportError::Timeout
    } else if err.is_connect() {
        TransportError::Connect(err.to_string())
    } else {
        TransportError::Other(err.to_string())
    }
}
