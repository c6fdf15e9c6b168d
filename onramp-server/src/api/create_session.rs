use axum::{
    Json,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use kanau::processor::Processor;
use onramp_core::session::{CreateSession, FailureKind, SessionFailure, SessionResult};
use onramp_core::validator::{AmountError, validate_amount};
use onramp_sdk::objects::{CreateSessionResponse, ErrorResponse};
use tokio::task::JoinError;

use crate::api::extractors::PurchaseBody;
use crate::state::AppState;

pub const CREATE_SESSION_PATH: &str = "/api/create-session";

const INTERNAL_FAULT: &str = "Internal server error while creating session";

// ---------------------------------------------------------------------------
// POST /api/create-session
// ---------------------------------------------------------------------------

/// `POST /api/create-session`: validate the purchase and open a provider session.
///
/// Validation failures answer 400 without contacting the provider. The
/// provider call itself runs on its own task, so a caller hanging up does
/// not abort it midway.
pub(super) async fn create_session(
    State(state): State<AppState>,
    PurchaseBody(body): PurchaseBody,
) -> Result<Json<CreateSessionResponse>, CreateSessionError> {
    tracing::debug!(
        has_phone = body.phone.is_some(),
        has_email = body.email.is_some(),
        "Session creation requested"
    );

    let amount = validate_amount(body.currency_amount.as_ref()).map_err(|e| {
        tracing::info!(
            error = %e,
            kind = %FailureKind::ClientValidationError,
            "Rejected purchase amount"
        );
        CreateSessionError::Validation(e)
    })?;

    let input = CreateSession {
        amount,
        phone: body.phone,
    };
    let creator = state.creator.clone();
    let Ok(result) = tokio::spawn(async move { creator.process(input).await })
        .await
        .map_err(CreateSessionError::Join)?;

    match result {
        SessionResult::Success(session) => Ok(Json(CreateSessionResponse {
            success: true,
            session_id: session.session_id,
            partner_id: session.partner_id,
            wallet_address: session.wallet_address,
            amount: session.amount,
            timestamp: session.timestamp,
        })),
        SessionResult::Failure(failure) => Err(CreateSessionError::Session(failure)),
    }
}

// ---------------------------------------------------------------------------
// Error handling
// ---------------------------------------------------------------------------

/// Errors that can occur while creating a session.
#[derive(Debug)]
pub(super) enum CreateSessionError {
    /// The amount is missing or out of bounds.
    Validation(AmountError),
    /// The pipeline produced a normalized failure.
    Session(SessionFailure),
    /// The provider task panicked or was cancelled.
    Join(JoinError),
}

impl IntoResponse for CreateSessionError {
    fn into_response(self) -> Response {
        match self {
            CreateSessionError::Validation(e) => (
                StatusCode::BAD_REQUEST,
                Json(ErrorResponse::new(e.to_string())),
            )
                .into_response(),
            CreateSessionError::Session(failure) => {
                let body = ErrorResponse::new(failure.message)
                    .with_details(failure.raw_body)
                    .with_provider_status(failure.provider_status);
                (failure_status(failure.status), Json(body)).into_response()
            }
            CreateSessionError::Join(e) => {
                tracing::error!(error = %e, "Session creation task failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(ErrorResponse::new(INTERNAL_FAULT)),
                )
                    .into_response()
            }
        }
    }
}

/// Mirror error statuses; anything else the provider sent becomes 502.
fn failure_status(status: u16) -> StatusCode {
    match StatusCode::from_u16(status) {
        Ok(code) if code.is_client_error() || code.is_server_error() => code,
        Ok(_) => StatusCode::BAD_GATEWAY,
        Err(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}
