//! Shared application state.

use onramp_core::processors::SessionCreator;
use onramp_core::rate_limit::SlidingWindowLimiter;
use std::sync::Arc;

/// Handed to every handler; cloning only bumps reference counts.
#[derive(Clone)]
pub struct AppState {
    pub creator: Arc<SessionCreator>,
    pub limiter: Arc<SlidingWindowLimiter>,
    /// Use the first `X-Forwarded-For` entry as caller identity.
    pub trust_forwarded_for: bool,
    /// Reported by `GET /`.
    pub environment: Arc<str>,
}

impl AppState {
    pub fn new(
        creator: SessionCreator,
        limiter: SlidingWindowLimiter,
        trust_forwarded_for: bool,
    ) -> Self {
        Self {
            creator: Arc::new(creator),
            limiter: Arc::new(limiter),
            trust_forwarded_for,
            environment: Arc::from(crate::config::DEFAULT_ENVIRONMENT),
        }
    }

    pub fn with_environment(mut self, environment: impl Into<Arc<str>>) -> Self {
        self.environment = environment.into();
        self
    }
}
