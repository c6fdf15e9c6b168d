//! HTTP API of the relay.
//!
//! # Endpoints
//!
//! - `POST /api/create-session` – validate a purchase and open a provider session
//!
//! Only session creation is rate limited; the service endpoints live in
//! [`crate::server`].

mod create_session;
pub mod extractors;
pub mod rate_limit;

use axum::{Router, middleware, routing::post};

use crate::state::AppState;

/// Build the session API router.
pub fn router(state: AppState) -> Router<AppState> {
    Router::new()
        .route(create_session::CREATE_SESSION_PATH, post(create_session::create_session))
        .route_layer(middleware::from_fn_with_state(
            state,
            rate_limit::limit_session_creation,
        ))
}
