//! visage-api - Facial aesthetic analysis service
//!
//! Accepts facial images, obtains sub-scores from a remote scoring model,
//! classifies and stores the result, and serves statistics over the stored
//! analyses.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use visage_common::config::{self, TomlConfig};

use visage_api::db::AnalysisStore;
use visage_api::services::GeminiOracle;
use visage_api::AppState;

/// Command-line arguments for visage-api
#[derive(Parser, Debug)]
#[command(name = "visage-api")]
#[command(about = "Facial aesthetic analysis service")]
#[command(version)]
struct Args {
    /// Path to the TOML configuration file
    #[arg(short, long, env = "VISAGE_CONFIG")]
    config: Option<PathBuf>,

    /// Address to bind
    #[arg(long, env = "VISAGE_HOST")]
    host: Option<String>,

    /// Port to listen on
    #[arg(short, long, env = "VISAGE_PORT")]
    port: Option<u16>,

    /// SQLite database file
    #[arg(short, long)]
    database: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config_path = args.config.clone().unwrap_or_else(config::default_config_path);

    // The log level lives in the config, so it is loaded before tracing starts
    let mut config =
        TomlConfig::load(&config_path).context("Failed to load configuration")?;
    config.apply_env_overrides();
    apply_args(&mut config, &args);

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                format!("visage_api={0},visage_common={0},tower_http=info", config.logging.level)
                    .into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting visage-api (Facial Aesthetic Analysis)");
    info!(
        "Version: {} | git {} | built {} | profile {}",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );
    if config_path.exists() {
        info!("Config file: {}", config_path.display());
    } else {
        warn!("Config file {} not found, using defaults", config_path.display());
    }

    config.validate().context("Invalid configuration")?;

    let db_path = config.database_path();
    info!("Database: {}", db_path.display());
    let pool = visage_common::db::init_database(&db_path)
        .await
        .context("Failed to initialize database")?;
    let store = AnalysisStore::new(pool);

    let oracle = GeminiOracle::new(&config.oracle).context("Failed to create oracle client")?;
    if !oracle.is_configured() {
        warn!("Oracle API key not configured: analysis requests will fail with 502");
    }
    info!(
        "Oracle model: {} (timeout {}s)",
        config.oracle.model_name, config.oracle.timeout_secs
    );

    let state = AppState::new(store, Arc::new(oracle), &config);
    if state.credentials.is_empty() {
        warn!("No API keys configured: every protected request will be rejected");
    } else {
        info!("Credentials: {} configured", state.credentials.len());
    }

    if let Some(limiter) = state.rate_limiter.clone() {
        info!(
            "Rate limit: {} requests/minute per client",
            config.rate_limit.requests_per_minute
        );
        // Drop idle client entries so the keyed store does not grow unbounded
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(Duration::from_secs(60));
            loop {
                ticker.tick().await;
                limiter.retain_recent();
            }
        });
    }

    let app = visage_api::build_router(state);

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .with_context(|| {
            format!(
                "Invalid listen address {}:{}",
                config.server.host, config.server.port
            )
        })?;

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;
    info!("Listening on http://{}", addr);
    info!("Health check: http://{}/api/health", addr);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await
    .context("Server error")?;

    info!("Server shutdown complete");
    Ok(())
}

/// Command-line flags take precedence over everything else
fn apply_args(config: &mut TomlConfig, args: &Args) {
    if let Some(host) = &args.host {
        config.server.host = host.clone();
    }
    if let Some(port) = args.port {
        config.server.port = port;
    }
    if let Some(database) = &args.database {
        config.database_path = Some(database.clone());
    }
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl+C: {}", e);
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
