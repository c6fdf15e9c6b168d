//! Onramp Relay Server
//!
//! Creates fiat-to-Bitcoin purchase sessions with the provider on behalf of
//! a browser frontend, keeping the partner API key on the server.

mod api;
mod config;
mod server;
mod shutdown;
mod state;

use clap::Parser;
use config::{ConfigLoader, Overrides};
use onramp_core::processors::SessionCreator;
use onramp_core::rate_limit::SlidingWindowLimiter;
use onramp_core::transport::{UpstreamInvoker, build_transport};
use server::{build_router, run_server};
use shutdown::spawn_limiter_purge;
use state::AppState;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};
use url::Url;

/// Onramp Relay - server-side session creation for a Bitcoin on-ramp widget
#[derive(Parser, Debug)]
#[command(name = "onramp-server")]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to an optional TOML configuration file
    #[arg(short, long, env = "ONRAMP_CONFIG")]
    config: Option<PathBuf>,

    /// Override the listen address (e.g., 0.0.0.0:3000)
    #[arg(short, long)]
    listen: Option<SocketAddr>,

    /// Listen on all interfaces at this port
    #[arg(long, env = "PORT")]
    port: Option<u16>,

    /// Provider partner API key
    #[arg(long, env = "WERT_API_KEY", hide_env_values = true)]
    api_key: String,

    /// Provider partner identifier
    #[arg(long, env = "WERT_PARTNER_ID")]
    partner_id: String,

    /// Wallet that receives purchased BTC
    #[arg(long, env = "WALLET_ADDRESS")]
    wallet_address: String,

    /// Provider create-session endpoint
    #[arg(long, env = "WERT_API_URL")]
    provider_url: Option<Url>,

    /// Deployment label reported by `GET /` (defaults to "production")
    #[arg(long, env = "ONRAMP_ENV")]
    environment: Option<String>,
}

impl Args {
    fn overrides(&self) -> Overrides {
        Overrides {
            listen: self.listen,
            port: self.port,
            api_key: self.api_key.clone(),
            partner_id: self.partner_id.clone(),
            wallet_address: self.wallet_address.clone(),
            provider_url: self.provider_url.clone(),
            environment: self.environment.clone(),
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // A missing .env file is fine; real environment variables still apply.
    let dotenv = dotenvy::dotenv();

    // Initialize tracing
    init_tracing();

    if let Err(e) = &dotenv {
        if !e.not_found() {
            tracing::warn!(error = %e, "Failed to read .env file");
        }
    }

    // Parse command line arguments
    let args = Args::parse();

    tracing::info!("Starting onramp-server v{}", env!("CARGO_PKG_VERSION"));

    // Load configuration
    let config_loader = ConfigLoader::new(args.config.clone(), args.overrides());
    let loaded_config = config_loader.load().map_err(|e| {
        tracing::error!("Failed to load configuration: {}", e);
        e
    })?;
    match config_loader.config_path() {
        Some(path) => tracing::info!("Configuration loaded from {:?}", path),
        None => tracing::info!("No configuration file given, using defaults"),
    }

    let transport = build_transport(
        loaded_config.upstream.transport,
        loaded_config.upstream.timeout,
    )
    .map_err(|e| {
        tracing::error!("Failed to initialize upstream transport: {}", e);
        e
    })?;

    let provider = &loaded_config.provider;
    tracing::info!(
        listen = %loaded_config.server.listen,
        environment = %loaded_config.server.environment,
        partner_id = %provider.partner_id,
        wallet = %provider.wallet_address,
        endpoint = %provider.endpoint,
        transport = transport.name(),
        timeout_secs = loaded_config.upstream.timeout.as_secs(),
        rate_limit = loaded_config.rate_limit.max_requests,
        rate_window_secs = loaded_config.rate_limit.window.as_secs(),
        "Relay configured"
    );

    // Create application state
    let invoker = UpstreamInvoker::new(transport, loaded_config.upstream.timeout);
    let creator = SessionCreator::new(Arc::new(loaded_config.provider.clone()), invoker);
    let limiter = SlidingWindowLimiter::new(loaded_config.rate_limit);
    let state = AppState::new(
        creator,
        limiter,
        loaded_config.server.trust_forwarded_for,
    )
    .with_environment(loaded_config.server.environment.as_str());

    let purge_task = spawn_limiter_purge(state.limiter.clone());

    // Build the router
    let router = build_router(
        state,
        loaded_config.cors,
        loaded_config.server.request_body_limit,
    );

    // Run the server
    let listen_addr = loaded_config.server.listen;
    tracing::info!("Starting HTTP server on {}", listen_addr);
    let result = run_server(router, listen_addr).await;

    purge_task.abort();
    tracing::info!("Server shutdown complete");

    result.map_err(Into::into)
}

/// Initialize the tracing subscriber with environment-based filtering.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,tower_http=debug"));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}
