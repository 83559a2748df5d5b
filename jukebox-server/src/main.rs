//! Jukebox server - Main entry point
//!
//! Loads configuration, builds the selected provider, starts the playback
//! engine and serves the HTTP API until Ctrl+C or SIGTERM.

use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use jukebox_common::events::EventBus;
use jukebox_server::api::{self, AppContext};
use jukebox_server::config::{CliOverrides, ProviderKind, ServerConfig};
use jukebox_server::provider::{
    CredentialSource, EnvToken, FileToken, PlaybackProvider, SimulatedProvider, SpotifyClient,
    TrackCatalog,
};
use jukebox_server::PlaybackEngine;

/// Command-line arguments for jukebox-server
#[derive(Parser, Debug)]
#[command(name = "jukebox-server")]
#[command(about = "Shared multi-user jukebox playback queue")]
#[command(version)]
struct Args {
    /// Path to the TOML configuration file (must exist when given)
    #[arg(short, long, env = "JUKEBOX_CONFIG")]
    config: Option<PathBuf>,

    /// Interface to bind to
    #[arg(long, env = "JUKEBOX_BIND_ADDR")]
    bind_addr: Option<IpAddr>,

    /// Port to listen on
    #[arg(short, long, env = "JUKEBOX_PORT")]
    port: Option<u16>,

    /// Token required on admin endpoints (empty disables the check)
    #[arg(long, env = "JUKEBOX_ADMIN_TOKEN", hide_env_values = true)]
    admin_token: Option<String>,

    /// Catalog and playback backend
    #[arg(long, value_enum, env = "JUKEBOX_PROVIDER")]
    provider: Option<ProviderKind>,

    /// Default log filter (RUST_LOG takes precedence)
    #[arg(long, env = "JUKEBOX_LOG_LEVEL")]
    log_level: Option<String>,
}

impl Args {
    fn overrides(&self) -> CliOverrides {
        CliOverrides {
            bind_addr: self.bind_addr,
            port: self.port,
            admin_token: self.admin_token.clone(),
            provider: self.provider,
            log_level: self.log_level.clone(),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Config is loaded before tracing starts so the file can set the log level
    let (mut config, config_path) =
        jukebox_common::config::load_or_default::<ServerConfig>(args.config.as_deref())
            .context("Failed to load configuration")?;
    config.apply_overrides(args.overrides());

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                format!(
                    "jukebox_server={level},jukebox_common={level},tower_http=info",
                    level = config.logging.level
                )
                .into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!(
        "Starting jukebox-server v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );
    match &config_path {
        Some(path) => info!("Configuration loaded from {}", path.display()),
        None => info!("Using built-in configuration defaults"),
    }

    config.validate().context("Invalid configuration")?;

    let (catalog, provider) = build_provider(&config)?;

    let events = EventBus::new(config.event_capacity);
    let engine = PlaybackEngine::start(catalog, provider, events, config.engine_settings());
    info!("Playback engine initialized");

    let admin_token = config.effective_admin_token();
    if admin_token.is_none() {
        warn!("No admin token configured, admin endpoints are open");
    }
    let app = api::create_router(AppContext::new(engine.clone(), admin_token));

    let addr = SocketAddr::new(config.bind_addr, config.port);
    info!("Starting HTTP server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    if let Err(e) = engine.shutdown().await {
        warn!("Playback engine already stopped: {}", e);
    }

    info!("Server shutdown complete");
    Ok(())
}

/// Build the catalog and playback provider selected in the configuration
fn build_provider(
    config: &ServerConfig,
) -> Result<(Arc<dyn TrackCatalog>, Arc<dyn PlaybackProvider>)> {
    match config.provider {
        ProviderKind::Spotify => {
            let credentials: Arc<dyn CredentialSource> = match &config.spotify.token_file {
                Some(path) => {
                    info!("Reading Spotify token from {}", path.display());
                    Arc::new(FileToken::new(path))
                }
                None => {
                    info!("Reading Spotify token from ${}", config.spotify.token_env);
                    Arc::new(EnvToken::new(&config.spotify.token_env))
                }
            };
            let client = Arc::new(
                SpotifyClient::new(
                    &config.spotify.api_base,
                    credentials,
                    config.provider_timeout(),
                )
                .context("Failed to create Spotify client")?,
            );
            info!("Using Spotify provider at {}", config.spotify.api_base);
            let catalog: Arc<dyn TrackCatalog> = client.clone();
            let provider: Arc<dyn PlaybackProvider> = client;
            Ok((catalog, provider))
        }
        ProviderKind::Simulated => {
            let provider = Arc::new(SimulatedProvider::new(config.simulated_tracks()));
            provider.set_device_available(config.simulated.device_available);
            info!(
                "Using simulated provider with {} catalog tracks",
                provider.tracks().len()
            );
            let catalog: Arc<dyn TrackCatalog> = provider.clone();
            let provider: Arc<dyn PlaybackProvider> = provider;
            Ok((catalog, provider))
        }
    }
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        },
    }
}
