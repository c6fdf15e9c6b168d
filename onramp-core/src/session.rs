//! Normalized outcome of a session-creation attempt.
//!
//! Every upstream response, malformed body or transport failure collapses
//! into a [`SessionResult`].

use rust_decimal::Decimal;
use serde::Deserialize;
use std::fmt;
use time::OffsetDateTime;

/// Purchase body as the frontend sends it, before validation.
///
/// `currency_amount` stays a raw JSON value so that absent, non-numeric and
/// numeric-string amounts all reach the validator.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct PurchaseRequest {
    #[serde(default)]
    pub currency_amount: Option<serde_json::Value>,
    #[serde(default)]
    pub phone: Option<String>,
    /// Accepted for compatibility; never forwarded.
    #[serde(default)]
    pub email: Option<String>,
}

/// Input to the session-creation pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateSession {
    pub amount: crate::validator::ValidAmount,
    pub phone: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SessionResult {
    Success(SessionSuccess),
    Failure(SessionFailure),
}

/// A provider session ready to be handed to the caller.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionSuccess {
    /// Never empty.
    pub session_id: String,
    pub partner_id: String,
    pub wallet_address: String,
    pub amount: Decimal,
    pub timestamp: OffsetDateTime,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SessionFailure {
    /// HTTP status to answer the caller with.
    pub status: u16,
    pub message: String,
    /// Provider body, when it was parseable JSON.
    pub raw_body: Option<serde_json::Value>,
    /// Status the provider answered with, if it answered at all.
    pub provider_status: Option<u16>,
    pub kind: FailureKind,
}

/// Error taxonomy of the relay.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureKind {
    /// Caller input violates the amount bounds.
    ClientValidationError,
    /// Provider answered non-2xx.
    UpstreamRejection,
    /// Provider answered 2xx without a usable session id.
    UpstreamMalformedResponse,
    /// Connection failed or timed out.
    TransportFailure,
    /// Anything else.
    InternalFault,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FailureKind::ClientValidationError => "client_validation",
            FailureKind::UpstreamRejection => "upstream_rejection",
            FailureKind::UpstreamMalformedResponse => "upstream_malformed_response",
            FailureKind::TransportFailure => "transport_failure",
            FailureKind::InternalFault => "internal_fault",
        };
        f.write_str(name)
    }
}

impl SessionFailure {
    pub fn new(status: u16, message: impl Into<String>, kind: FailureKind) -> Self {
        Self {
            status,
            message: message.into(),
            raw_body: None,
            provider_status: None,
            kind,
        }
    }

    /// A 500 for failures that are not the caller's or the provider's fault.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(500, message, FailureKind::InternalFault)
    }

    pub fn with_raw_body(mut self, raw_body: Option<serde_json::Value>) -> Self {
        self.raw_body = raw_body;
        self
    }

    pub fn with_provider_status(mut self, status: u16) -> Self {
        self.provider_status = Some(status);
        self
    }
}

impl SessionResult {
    pub fn is_success(&self) -> bool {
        matches!(self, SessionResult::Success(_))
    }
}
