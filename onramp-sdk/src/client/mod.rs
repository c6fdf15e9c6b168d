//! HTTP client for the relay API.
//!
//! Gated behind the `client` cargo feature so downstream crates that only
//! need the shared types do not pull in `reqwest`.

mod relay;

pub use relay::RelayClient;

use reqwest::StatusCode;

use crate::objects::ErrorResponse;

/// Errors produced by the SDK HTTP client.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// Transport-level failure (DNS, TLS, connection reset, …).
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// The relay answered with a structured error body.
    #[error("api error: status {status}, error: {}", body.error)]
    Api {
        status: StatusCode,
        body: ErrorResponse,
    },

    /// The relay answered with a non-2xx status and an unrecognised body.
    #[error("unexpected response: status {status}, body: {body}")]
    Unexpected { status: StatusCode, body: String },

    /// Response body could not be deserialized.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// The base URL could not be joined with the endpoint path.
    #[error("invalid url: {0}")]
    Url(#[from] url::ParseError),
}
