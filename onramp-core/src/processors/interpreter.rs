//! Response interpretation and error normalization.
//!
//! | Provider outcome                          | Result                                   |
//! |-------------------------------------------|------------------------------------------|
//! | 2xx with non-empty string `sessionId`     | `Success`                                |
//! | 2xx without one (or body not JSON)        | 500 "invalid response: missing session id" |
//! | non-2xx with `message` / `error` string   | provider status, that text               |
//! | non-2xx otherwise                         | provider status, default for the status  |
//! | connect failure / timeout / other         | 500, message naming the failure          |

use crate::config::ProviderConfig;
use crate::session::{FailureKind, SessionFailure, SessionResult, SessionSuccess};
use crate::transport::{TransportError, UpstreamResponse};
use rust_decimal::Decimal;
use serde_json::Value;
use time::OffsetDateTime;
use tracing::{error, warn};

pub const MISSING_SESSION_ID: &str = "invalid response: missing session id";
pub const CONNECT_FAILED: &str = "unable to connect to provider API";
pub const TIMED_OUT: &str = "request to provider API timed out";
pub const TRANSPORT_FAILED: &str = "failed to reach provider API";

/// Message used when a provider error body carries no usable reason.
pub fn status_default_message(status: u16) -> String {
    match status {
        400 => "invalid request data".to_string(),
        401 => "unauthorized: invalid api key".to_string(),
        429 => "rate limit exceeded".to_string(),
        500 => "upstream server error".to_string(),
        other => format!("upstream error ({other})"),
    }
}

/// Interprets provider outcomes for one purchase.
pub struct ResponseInterpreter<'a> {
    config: &'a ProviderConfig,
    amount: Decimal,
}

impl<'a> ResponseInterpreter<'a> {
    pub fn new(config: &'a ProviderConfig, amount: Decimal) -> Self {
        Self { config, amount }
    }

    pub fn interpret(
        &self,
        outcome: Result<UpstreamResponse, TransportError>,
        now: OffsetDateTime,
    ) -> SessionResult {
        match outcome {
            Ok(response) if (200..300).contains(&response.status) => {
                self.interpret_success(response, now)
            }
            Ok(response) => SessionResult::Failure(interpret_rejection(response)),
            Err(e) => SessionResult::Failure(interpret_transport_error(&e)),
        }
    }

    fn interpret_success(&self, response: UpstreamResponse, now: OffsetDateTime) -> SessionResult {
        let parsed: Option<Value> = serde_json::from_slice(&response.body).ok();

        match parsed.as_ref().and_then(session_id) {
            Some(session_id) => SessionResult::Success(SessionSuccess {
                session_id: session_id.to_owned(),
                partner_id: self.config.partner_id.clone(),
                wallet_address: self.config.wallet_address.clone(),
                amount: self.amount,
                timestamp: now,
            }),
            None => {
                error!(
                    status = response.status,
                    body = %String::from_utf8_lossy(&response.body),
                    "Provider response is missing the session id"
                );
                SessionResult::Failure(
                    SessionFailure::new(500, MISSING_SESSION_ID, FailureKind::UpstreamMalformedResponse)
                        .with_raw_body(parsed)
                        .with_provider_status(response.status),
                )
            }
        }
    }
}

fn interpret_rejection(response: UpstreamResponse) -> SessionFailure {
    let parsed: Option<Value> = serde_json::from_slice(&response.body).ok();

    let message = match parsed.as_ref().and_then(provider_message) {
        Some(message) => message.to_owned(),
        None => {
            if parsed.is_none() {
                warn!(
                    status = response.status,
                    body = %String::from_utf8_lossy(&response.body),
                    "Provider returned a non-JSON error body"
                );
            }
            status_default_message(response.status)
        }
    };

    SessionFailure::new(response.status, message, FailureKind::UpstreamRejection)
        .with_raw_body(parsed)
        .with_provider_status(response.status)
}

fn interpret_transport_error(err: &TransportError) -> SessionFailure {
    let message = match err {
        TransportError::Connect(_) => CONNECT_FAILED,
        TransportError::Timeout => TIMED_OUT,
        TransportError::Unavailable(_) | TransportError::Other(_) => TRANSPORT_FAILED,
    };
    SessionFailure::new(500, message, FailureKind::TransportFailure)
}

fn session_id(body: &Value) -> Option<&str> {
    body.get("sessionId")
        .and_then(Value::as_str)
        .filter(|id| !id.is_empty())
}

fn provider_message(body: &Value) -> Option<&str> {
    ["message", "error"].into_iter().find_map(|field| {
        body.get(field)
            .and_then(Value::as_str)
            .filter(|text| !text.is_empty())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ApiKey;
    use bytes::Bytes;
    use serde_json::json;
    use url::Url;

    fn config() -> ProviderConfig {
        ProviderConfig::new(
            ApiKey::new("key"),
            "partner-1",
            "wallet-1",
            Url::parse("https://provider.test/create").unwrap(),
        )
    }

    fn respond(status: u16, body: &str) -> Result<UpstreamResponse, TransportError> {
        Ok(UpstreamResponse {
            status,
            body: Bytes::copy_from_slice(body.as_bytes()),
        })
    }

    fn interpret(outcome: Result<UpstreamResponse, TransportError>) -> SessionResult {
        let config = config();
        ResponseInterpreter::new(&config, Decimal::from(100))
            .interpret(outcome, OffsetDateTime::UNIX_EPOCH)
    }

    fn failure(result: SessionResult) -> SessionFailure {
        match result {
            SessionResult::Failure(failure) => failure,
            SessionResult::Success(success) => panic!("expected failure, got {success:?}"),
        }
    }

    #[test]
    fn test_success_echoes_configuration() {
        let result = interpret(respond(200, r#"{"sessionId":"abc123","extra":1}"#));
        assert_eq!(
            result,
            SessionResult::Success(SessionSuccess {
                session_id: "abc123".to_string(),
                partner_id: "partner-1".to_string(),
                wallet_address: "wallet-1".to_string(),
                amount: Decimal::from(100),
                timestamp: OffsetDateTime::UNIX_EPOCH,
            })
        );
    }

    #[test]
    fn test_success_without_session_id() {
        for body in [
            r#"{"other":"x"}"#,
            r#"{"sessionId":""}"#,
            r#"{"sessionId":42}"#,
            "not json",
            "",
        ] {
            let failure = failure(interpret(respond(200, body)));
            assert_eq!(failure.status, 500);
            assert_eq!(failure.message, MISSING_SESSION_ID);
            assert_eq!(failure.kind, FailureKind::UpstreamMalformedResponse);
        }

        let failure = failure(interpret(respond(200, r#"{"other":"x"}"#)));
        assert_eq!(failure.raw_body, Some(json!({ "other": "x" })));
    }

    #[test]
    fn test_rejection_with_message() {
        let failure = failure(interpret(respond(401, r#"{"message":"invalid key"}"#)));
        assert_eq!(failure.status, 401);
        assert_eq!(failure.message, "invalid key");
        assert_eq!(failure.raw_body, Some(json!({ "message": "invalid key" })));
        assert_eq!(failure.provider_status, Some(401));
        assert_eq!(failure.kind, FailureKind::UpstreamRejection);
    }

    #[test]
    fn test_rejection_falls_back_to_error_field() {
        let failure = failure(interpret(respond(422, r#"{"error":"bad phone"}"#)));
        assert_eq!(failure.status, 422);
        assert_eq!(failure.message, "bad phone");
    }

    #[test]
    fn test_rejection_without_json_uses_status_defaults() {
        let cases = [
            (400, "invalid request data"),
            (401, "unauthorized: invalid api key"),
            (429, "rate limit exceeded"),
            (500, "upstream server error"),
            (503, "upstream error (503)"),
        ];
        for (status, message) in cases {
            let failure = failure(interpret(respond(status, "<html>oops</html>")));
            assert_eq!(failure.status, status);
            assert_eq!(failure.message, message);
            assert_eq!(failure.raw_body, None);
        }
    }

    #[test]
    fn test_rejection_with_json_but_no_reason() {
        let failure = failure(interpret(respond(400, r#"{"code":17}"#)));
        assert_eq!(failure.message, "invalid request data");
        assert_eq!(failure.raw_body, Some(json!({ "code": 17 })));
    }

    #[test]
    fn test_transport_failures() {
        let connect = failure(interpret(Err(TransportError::Connect("refused".into()))));
        assert_eq!(connect.status, 500);
        assert_eq!(connect.message, CONNECT_FAILED);
        assert_eq!(connect.raw_body, None);
        assert_eq!(connect.provider_status, None);

        let timeout = failure(interpret(Err(TransportError::Timeout)));
        assert_eq!(timeout.message, TIMED_OUT);
        assert_eq!(timeout.kind, FailureKind::TransportFailure);

        let other = failure(interpret(Err(TransportError::Other("reset".into()))));
        assert_eq!(other.message, TRANSPORT_FAILED);
    }
}
