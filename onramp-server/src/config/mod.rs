//! Configuration module for onramp-server.
//!
//! Merges the optional TOML file with CLI flags and environment variables
//! into a validated [`LoadedConfig`]. Provider secrets only ever come from
//! the command line or the environment.

pub mod file;

use crate::config::file::FileConfig;
use onramp_core::config::{
    ApiKey, CorsPolicy, DEFAULT_PROVIDER_URL, DEFAULT_USER_AGENT, ProviderConfig, RateLimitConfig,
    UpstreamConfig,
};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;
use url::Url;

/// Fallback when neither flags, `PORT` nor the file name an address.
pub const DEFAULT_LISTEN: SocketAddr =
    SocketAddr::new(std::net::IpAddr::V4(std::net::Ipv4Addr::UNSPECIFIED), 3000);

/// Deployment label used when none is configured.
pub const DEFAULT_ENVIRONMENT: &str = "production";

/// Errors that can occur during configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("failed to parse config file: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("{0} must be set and non-empty")]
    MissingSecret(&'static str),

    #[error("validation error: {0}")]
    ValidationError(String),
}

/// Values supplied on the command line or through the environment.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub listen: Option<SocketAddr>,
    pub port: Option<u16>,
    pub api_key: String,
    pub partner_id: String,
    pub wallet_address: String,
    pub provider_url: Option<Url>,
    pub environment: Option<String>,
}

/// Server-only settings.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub listen: SocketAddr,
    pub trust_forwarded_for: bool,
    pub request_body_limit: usize,
    pub environment: String,
}

/// Loaded configuration result containing all parts.
#[derive(Debug, Clone)]
pub struct LoadedConfig {
    pub server: ServerConfig,
    pub provider: ProviderConfig,
    pub upstream: UpstreamConfig,
    pub cors: CorsPolicy,
    pub rate_limit: RateLimitConfig,
}

/// Configuration loader that handles the complete loading process.
pub struct ConfigLoader {
    config_path: Option<PathBuf>,
    overrides: Overrides,
}

impl ConfigLoader {
    pub fn new(config_path: Option<PathBuf>, overrides: Overrides) -> Self {
        Self {
            config_path,
            overrides,
        }
    }

    pub fn config_path(&self) -> Option<&PathBuf> {
        self.config_path.as_ref()
    }

    /// Load and process the configuration.
    ///
    /// This will:
    /// 1. Read the TOML file, if one was given
    /// 2. Apply CLI and environment overrides
    /// 3. Validate the result
    pub fn load(&self) -> Result<LoadedConfig, ConfigError> {
        let file_config = match &self.config_path {
            Some(path) => toml::from_str(&std::fs::read_to_string(path)?)?,
            None => FileConfig::default(),
        };

        self.build_loaded_config(file_config)
    }

    fn build_loaded_config(&self, file: FileConfig) -> Result<LoadedConfig, ConfigError> {
        let overrides = &self.overrides;

        let api_key = require_secret("WERT_API_KEY", &overrides.api_key)?;
        let partner_id = require_secret("WERT_PARTNER_ID", &overrides.partner_id)?;
        let wallet_address = require_secret("WALLET_ADDRESS", &overrides.wallet_address)?;

        let endpoint = match overrides.provider_url.clone().or(file.upstream.url) {
            Some(url) => url,
            None => Url::parse(DEFAULT_PROVIDER_URL)
                .map_err(|e| ConfigError::ValidationError(format!("default provider url: {e}")))?,
        };
        if !matches!(endpoint.scheme(), "http" | "https") {
            return Err(ConfigError::ValidationError(format!(
                "provider url must use http or https, got {}",
                endpoint.scheme()
            )));
        }

        if file.upstream.timeout_secs == 0 {
            return Err(ConfigError::ValidationError(
                "upstream.timeout_secs must be greater than zero".to_string(),
            ));
        }
        if file.rate_limit.max_requests == 0 {
            return Err(ConfigError::ValidationError(
                "rate_limit.max_requests must be greater than zero".to_string(),
            ));
        }
        if file.rate_limit.window_secs == 0 {
            return Err(ConfigError::ValidationError(
                "rate_limit.window_secs must be greater than zero".to_string(),
            ));
        }

        let listen = overrides
            .listen
            .or_else(|| overrides.port.map(|port| SocketAddr::new(DEFAULT_LISTEN.ip(), port)))
            .or(file.server.listen)
            .unwrap_or(DEFAULT_LISTEN);

        let environment = overrides
            .environment
            .as_deref()
            .map(str::trim)
            .filter(|env| !env.is_empty())
            .unwrap_or(DEFAULT_ENVIRONMENT)
            .to_string();

        let user_agent = file
            .upstream
            .user_agent
            .filter(|ua| !ua.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_USER_AGENT.to_string());

        Ok(LoadedConfig {
            server: ServerConfig {
                listen,
                trust_forwarded_for: file.server.trust_forwarded_for,
                request_body_limit: file.server.request_body_limit,
                environment,
            },
            provider: ProviderConfig::new(ApiKey::new(api_key), partner_id, wallet_address, endpoint)
                .with_user_agent(user_agent),
            upstream: UpstreamConfig {
                timeout: Duration::from_secs(file.upstream.timeout_secs),
                transport: file.upstream.transport,
            },
            cors: CorsPolicy {
                allowed_origins: file.cors.allowed_origins,
                allowed_origin_suffixes: file.cors.allowed_origin_suffixes,
                allow_localhost: file.cors.allow_localhost,
            },
            rate_limit: RateLimitConfig {
                max_requests: file.rate_limit.max_requests,
                window: Duration::from_secs(file.rate_limit.window_secs),
            },
        })
    }
}

fn require_secret(name: &'static str, value: &str) -> Result<String, ConfigError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(ConfigError::MissingSecret(name));
    }
    Ok(value.to_string())
}
