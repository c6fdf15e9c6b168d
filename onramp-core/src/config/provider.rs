//! Provider credentials and endpoint.

use std::fmt;
use url::Url;

/// Public create-session endpoint of the provider.
pub const DEFAULT_PROVIDER_URL: &str = "https://partner.wert.io/api/external/hpp/create-session";

pub const DEFAULT_USER_AGENT: &str = concat!("onramp-relay/", env!("CARGO_PKG_VERSION"));

/// Partner API key. `Debug` output never contains the key itself.
#[derive(Clone, PartialEq, Eq)]
pub struct ApiKey(String);

impl ApiKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    /// The raw key, for the request header only.
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ApiKey(***)")
    }
}

/// Everything needed to talk to the provider on behalf of the partner.
#[derive(Debug, Clone)]
pub struct ProviderConfig {
    pub api_key: ApiKey,
    /// Partner identifier echoed to the frontend.
    pub partner_id: String,
    /// Wallet that receives the purchased BTC.
    pub wallet_address: String,
    /// Create-session endpoint.
    pub endpoint: Url,
    pub user_agent: String,
}

impl ProviderConfig {
    pub fn new(
        api_key: ApiKey,
        partner_id: impl Into<String>,
        wallet_address: impl Into<String>,
        endpoint: Url,
    ) -> Self {
        Self {
            api_key,
            partner_id: partner_id.into(),
            wallet_address: wallet_address.into(),
            endpoint,
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_key_is_redacted() {
        let config = ProviderConfig::new(
            ApiKey::new("super-secret"),
            "partner",
            "wallet",
            Url::parse(DEFAULT_PROVIDER_URL).unwrap(),
        );
        let debug = format!("{config:?}");
        assert!(!debug.contains("super-secret"));
        assert!(debug.contains("ApiKey(***)"));
        assert_eq!(config.api_key.expose(), "super-secret");
    }
}
