use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Bound applied to every provider call.
pub const DEFAULT_UPSTREAM_TIMEOUT: Duration = Duration::from_secs(30);

/// Which transport carries the provider request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransportKind {
    /// HTTP client first, raw socket transport when the client is unavailable.
    #[default]
    Auto,
    /// Only the `reqwest` HTTP client.
    HttpClient,
    /// Only the hand-written HTTP/1.1 transport.
    Raw,
}

/// How provider calls are carried out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UpstreamConfig {
    pub timeout: Duration,
    pub transport: TransportKind,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_UPSTREAM_TIMEOUT,
            transport: TransportKind::Auto,
        }
    }
}
