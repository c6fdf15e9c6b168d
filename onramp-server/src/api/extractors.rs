//! Custom Axum extractors.
//!
//! Provides:
//! - `ClientIp`: caller identity for rate limiting
//! - `PurchaseBody`: the purchase JSON, tolerant of an empty body

use axum::{
    Json,
    body::Bytes,
    extract::{ConnectInfo, FromRequest, FromRequestParts, Request},
    http::{StatusCode, request::Parts},
    response::{IntoResponse, Response},
};
use onramp_core::session::PurchaseRequest;
use onramp_sdk::objects::ErrorResponse;
use std::convert::Infallible;
use std::net::SocketAddr;

use crate::state::AppState;

const FORWARDED_FOR: &str = "x-forwarded-for";

// ---------------------------------------------------------------------------
// ClientIp
// ---------------------------------------------------------------------------

/// Caller identity: the peer address, or the first `X-Forwarded-For` entry
/// when the relay is configured to trust it. `"unknown"` if neither exists.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientIp(pub String);

impl FromRequestParts<AppState> for ClientIp {
    type Rejection = Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        if state.trust_forwarded_for {
            let forwarded = parts
                .headers
                .get(FORWARDED_FOR)
                .and_then(|value| value.to_str().ok())
                .and_then(|value| value.split(',').next())
                .map(str::trim)
                .filter(|value| !value.is_empty());
            if let Some(ip) = forwarded {
                return Ok(ClientIp(ip.to_owned()));
            }
        }

        let ip = match ConnectInfo::<SocketAddr>::from_request_parts(parts, state).await {
            Ok(ConnectInfo(addr)) => addr.ip().to_string(),
            Err(_) => "unknown".to_owned(),
        };
        Ok(ClientIp(ip))
    }
}

// ---------------------------------------------------------------------------
// PurchaseBody
// ---------------------------------------------------------------------------

/// The purchase request body. An empty body reads as `{}`, so a missing
/// amount is reported by the validator rather than as a parse error.
#[derive(Debug)]
pub struct PurchaseBody(pub PurchaseRequest);

#[derive(Debug, thiserror::Error)]
pub enum PurchaseBodyError {
    #[error("failed to read request body")]
    Read(StatusCode),
    #[error("invalid JSON body: {0}")]
    Json(serde_json::Error),
}

impl IntoResponse for PurchaseBodyError {
    fn into_response(self) -> Response {
        match self {
            PurchaseBodyError::Read(status) => {
                let message = if status == StatusCode::PAYLOAD_TOO_LARGE {
                    "Request body too large"
                } else {
                    "Failed to read request body"
                };
                (status, Json(ErrorResponse::new(message))).into_response()
            }
            PurchaseBodyError::Json(e) => {
                tracing::debug!(error = %e, "Rejected malformed purchase body");
                (
                    StatusCode::BAD_REQUEST,
                    Json(ErrorResponse::new("Invalid JSON in request body")),
                )
                    .into_response()
            }
        }
    }
}

impl FromRequest<AppState> for PurchaseBody {
    type Rejection = PurchaseBodyError;

    async fn from_request(req: Request, state: &AppState) -> Result<Self, Self::Rejection> {
        let bytes = Bytes::from_request(req, state)
            .await
            .map_err(|rejection| PurchaseBodyError::Read(rejection.status()))?;

        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(PurchaseBody(PurchaseRequest::default()));
        }

        serde_json::from_slice(&bytes)
            .map(PurchaseBody)
            .map_err(PurchaseBodyError::Json)
    }
}
