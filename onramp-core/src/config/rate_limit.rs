use std::time::Duration;

/// Session-creation rate limit applied per caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitConfig {
    pub max_requests: u32,
    pub window: Duration,
}

impl Default for RateLimitConfig {
    /// 50 requests per 15 minutes.
    fn default() -> Self {
        Self {
            max_requests: 50,
            window: Duration::from_secs(15 * 60),
        }
    }
}
