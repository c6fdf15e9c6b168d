//! Configuration types for the relay.
//!
//! These types represent the validated runtime configuration used by the
//! server. The actual loading and parsing is handled by the server crate.
//! All of them are immutable after startup.

mod cors;
mod provider;
mod rate_limit;
mod upstream;

pub use cors::CorsPolicy;
pub use provider::{ApiKey, DEFAULT_PROVIDER_URL, DEFAULT_USER_AGENT, ProviderConfig};
pub use rate_limit::RateLimitConfig;
pub use upstream::{DEFAULT_UPSTREAM_TIMEOUT, TransportKind, UpstreamConfig};
