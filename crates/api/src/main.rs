//! `solar-api` — service binary entry point.
//!
//! Startup sequence:
//! 1. Load and validate [`Config`] from environment variables (and `.env`).
//! 2. Initialise structured JSON logging.
//! 3. Open the PostgreSQL connection pool.
//! 4. Build the token verifier, shared state, and Axum router.
//! 5. Serve HTTP until Ctrl-C / SIGTERM, then drain in-flight requests.

mod auth;
mod config;
mod profile;
mod quote;
mod server;
mod telemetry;

use std::sync::Arc;

use anyhow::Result;
use tracing::info;

use auth::TokenVerifier;
use config::Config;
use profile::PgProfileStore;
use server::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // -----------------------------------------------------------------------
    // 1. Configuration
    // -----------------------------------------------------------------------
    let cfg = Config::from_env().map_err(|e| {
        // Logging is not yet up; write to stderr directly.
        eprintln!("ERROR: configuration invalid: {e:#}");
        e
    })?;

    // -----------------------------------------------------------------------
    // 2. Telemetry
    // -----------------------------------------------------------------------
    telemetry::init(&cfg.log_level)?;
    info!(
        version = env!("CARGO_PKG_VERSION"),
        port = cfg.port,
        anon_key_configured = cfg.supabase_anon_key.is_some(),
        "solar-api starting"
    );

    // -----------------------------------------------------------------------
    // 3. Database
    // -----------------------------------------------------------------------
    let store = PgProfileStore::connect(&cfg).await?;
    info!(
        max_connections = cfg.database_max_connections,
        "database pool ready"
    );

    // -----------------------------------------------------------------------
    // 4. Router
    // -----------------------------------------------------------------------
    let verifier = TokenVerifier::new(&cfg.supabase_jwt_secret, cfg.jwt_audience.clone());
    let state = AppState::new(Arc::new(store), verifier);
    let router = server::router::build(state, server::middleware::cors(cfg.cors_origins()?));

    // -----------------------------------------------------------------------
    // 5. HTTP server
    // -----------------------------------------------------------------------
    let addr: std::net::SocketAddr = ([0, 0, 0, 0], cfg.port).into();
    info!(addr = %addr, "listening");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("solar-api stopped");
    Ok(())
}

/// Resolve on Ctrl-C, or on SIGTERM where the platform has it.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!(error = %e, "failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::warn!(error = %e, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
    info!("shutdown signal received");
}
