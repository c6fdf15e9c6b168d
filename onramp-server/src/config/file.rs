//! TOML file configuration structures.
//!
//! Every section and field is optional; a missing file behaves like an
//! empty one. Secrets never live here.

use onramp_core::config::TransportKind;
use serde::Deserialize;
use std::net::SocketAddr;
use url::Url;

/// Root configuration structure as read from the TOML file.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FileConfig {
    pub server: ServerSection,
    pub upstream: UpstreamSection,
    pub cors: CorsSection,
    pub rate_limit: RateLimitSection,
}

/// `[server]`
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServerSection {
    /// The address and port to listen on (e.g., "0.0.0.0:3000").
    pub listen: Option<SocketAddr>,
    /// Take caller identity from the first `X-Forwarded-For` entry.
    pub trust_forwarded_for: bool,
    /// Maximum accepted request body, in bytes.
    pub request_body_limit: usize,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            listen: None,
            trust_forwarded_for: false,
            request_body_limit: 10 * 1024 * 1024,
        }
    }
}

/// `[upstream]`
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct UpstreamSection {
    /// Provider create-session endpoint. `WERT_API_URL` takes precedence.
    pub url: Option<Url>,
    pub timeout_secs: u64,
    pub transport: TransportKind,
    pub user_agent: Option<String>,
}

impl Default for UpstreamSection {
    fn default() -> Self {
        Self {
            url: None,
            timeout_secs: 30,
            transport: TransportKind::Auto,
            user_agent: None,
        }
    }
}

/// `[cors]`
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CorsSection {
    pub allowed_origins: Vec<String>,
    /// e.g. `.netlify.app`
    pub allowed_origin_suffixes: Vec<String>,
    pub allow_localhost: bool,
}

/// `[rate_limit]`
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RateLimitSection {
    pub max_requests: u32,
    pub window_secs: u64,
}

impl Default for RateLimitSection {
    fn default() -> Self {
        Self {
            max_requests: 50,
            window_secs: 900,
        }
    }
}
