use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

/// Request body for `POST /api/create-session`.
///
/// This is the client-side shape. The relay itself accepts a looser body so
/// it can report precise validation errors for malformed amounts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateSessionRequest {
    /// Purchase amount in USD.
    #[serde(with = "rust_decimal::serde::float")]
    pub currency_amount: Decimal,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

impl CreateSessionRequest {
    pub fn new(currency_amount: Decimal) -> Self {
        Self {
            currency_amount,
            phone: None,
            email: None,
        }
    }

    pub fn with_phone(mut self, phone: impl Into<String>) -> Self {
        self.phone = Some(phone.into());
        self
    }

    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }
}

/// Successful response of `POST /api/create-session`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateSessionResponse {
    /// Always `true`.
    pub success: bool,
    /// Provider-issued session identifier.
    pub session_id: String,
    /// Partner identifier the frontend needs to open the provider widget.
    pub partner_id: String,
    /// Destination wallet configured on the relay.
    pub wallet_address: String,
    /// The amount that was requested.
    #[serde(with = "rust_decimal::serde::float")]
    pub amount: Decimal,
    #[serde(with = "time::serde::rfc3339")]
    pub timestamp: OffsetDateTime,
}

/// Error body returned by every failing relay endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorResponse {
    /// Always `false`.
    pub success: bool,
    pub error: String,
    /// Raw provider body, when the provider returned parseable JSON.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
    /// Status code the provider answered with, when the failure came from it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider_status: Option<u16>,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: error.into(),
            details: None,
            provider_status: None,
        }
    }

    pub fn with_details(mut self, details: Option<serde_json::Value>) -> Self {
        self.details = details;
        self
    }

    pub fn with_provider_status(mut self, status: Option<u16>) -> Self {
        self.provider_status = status;
        self
    }
}
