//! Per-caller throttling of session creation.

use axum::{
    Json,
    extract::{Request, State},
    http::{HeaderName, HeaderValue, StatusCode, header::RETRY_AFTER},
    middleware::Next,
    response::{IntoResponse, Response},
};
use onramp_sdk::objects::ErrorResponse;

use crate::api::extractors::ClientIp;
use crate::state::AppState;

pub const RATE_LIMITED_MESSAGE: &str =
    "Too many session creation requests, please try again later.";

static RATE_LIMIT_LIMIT: HeaderName = HeaderName::from_static("x-ratelimit-limit");
static RATE_LIMIT_REMAINING: HeaderName = HeaderName::from_static("x-ratelimit-remaining");

/// Runs before body parsing, so rejected callers never reach the validator.
pub(super) async fn limit_session_creation(
    State(state): State<AppState>,
    ClientIp(ip): ClientIp,
    request: Request,
    next: Next,
) -> Response {
    let decision = state.limiter.try_acquire(&ip);

    if !decision.allowed {
        let retry_after = decision.retry_after.as_secs().max(1);
        tracing::warn!(client = %ip, retry_after, "Session creation rate limit exceeded");
        let mut response = (
            StatusCode::TOO_MANY_REQUESTS,
            Json(ErrorResponse::new(RATE_LIMITED_MESSAGE)),
        )
            .into_response();
        let headers = response.headers_mut();
        headers.insert(RETRY_AFTER, HeaderValue::from(retry_after));
        headers.insert(
            RATE_LIMIT_LIMIT.clone(),
            HeaderValue::from(state.limiter.max_requests()),
        );
        headers.insert(RATE_LIMIT_REMAINING.clone(), HeaderValue::from(0u32));
        return response;
    }

    let mut response = next.run(request).await;
    let headers = response.headers_mut();
    headers.insert(
        RATE_LIMIT_LIMIT.clone(),
        HeaderValue::from(state.limiter.max_requests()),
    );
    headers.insert(
        RATE_LIMIT_REMAINING.clone(),
        HeaderValue::from(decision.remaining),
    );
    response
}
