//! Bodies of the service-level endpoints (`/`, `/health`, 404 fallback).

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

/// `GET /health` response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    #[serde(with = "time::serde::rfc3339")]
    pub timestamp: OffsetDateTime,
}

/// `GET /` response identifying the service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceInfo {
    pub success: bool,
    pub message: String,
    pub status: String,
    pub version: String,
    #[serde(with = "time::serde::rfc3339")]
    pub timestamp: OffsetDateTime,
    /// Deployment label, e.g. `production` or `staging`.
    pub environment: String,
}

/// Body returned for any route the relay does not serve.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotFoundResponse {
    pub success: bool,
    pub error: String,
    pub available_endpoints: Vec<String>,
}
