use reqwest::Client;
use url::Url;

use super::ClientError;
use crate::objects::{CreateSessionRequest, CreateSessionResponse, ErrorResponse, HealthResponse};

/// Typed HTTP client for the relay API.
///
/// Intended for frontends written in Rust and for end-to-end tests.
#[derive(Debug, Clone)]
pub struct RelayClient {
    http: Client,
    base_url: Url,
}

impl RelayClient {
    /// Create a new `RelayClient`.
    ///
    /// * `base_url` – root URL of the relay (e.g. `https://relay.example.com`).
    pub fn new(base_url: Url) -> Self {
        Self {
            http: Client::new(),
            base_url,
        }
    }

    /// Replace the default `reqwest::Client` with a custom one (e.g. to
    /// configure timeouts or a proxy).
    pub fn with_http_client(mut self, client: Client) -> Self {
        self.http = client;
        self
    }

    /// `POST /api/create-session` – open a purchase session with the provider.
    pub async fn create_session(
        &self,
        request: &CreateSessionRequest,
    ) -> Result<CreateSessionResponse, ClientError> {
        let url = self.base_url.join("/api/create-session")?;

        let resp = self.http.post(url).json(request).send().await?;

        parse_response(resp).await
    }

    /// `GET /health`: liveness check.
    pub async fn health(&self) -> Result<HealthResponse, ClientError> {
        let url = self.base_url.join("/health")?;

        let resp = self.http.get(url).send().await?;

        parse_response(resp).await
    }
}

async fn parse_response<T: serde::de::DeserializeOwned>(
    resp: reqwest::Response,
) -> Result<T, ClientError> {
    let status = resp.status();
    let bytes = resp.bytes().await?;
    if !status.is_success() {
        return Err(match serde_json::from_slice::<ErrorResponse>(&bytes) {
            Ok(body) => ClientError::Api { status, body },
            Err(_) => ClientError::Unexpected {
                status,
                body: String::from_utf8_lossy(&bytes).into_owned(),
            },
        });
    }
    serde_json::from_slice(&bytes).map_err(ClientError::Json)
}
