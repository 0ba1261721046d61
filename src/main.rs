//! Comix Commerce API server

use std::net::SocketAddr;
use std::time::Duration;

use anyhow::{Context, Result};
use sqlx::postgres::PgPoolOptions;
use tokio::signal;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use comix_commerce::{
    build_app,
    services::{
        cleanup::{stale_order_cleanup, CleanupSettings},
        EventPublisher,
    },
    AppState, Config,
};

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::from_env().context("Failed to load configuration")?;

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| config.log_level.clone().into()))
        .with(tracing_subscriber::fmt::layer().with_target(true))
        .init();

    tracing::info!(environment = config.environment.as_str(), database = %config.database_url_masked(), "Connecting to database");
    let db = PgPoolOptions::new()
        .max_connections(config.db_max_connections)
        .acquire_timeout(Duration::from_secs(10))
        .connect(&config.database_url)
        .await
        .context("Failed to connect to database")?;
    sqlx::migrate!("./migrations").run(&db).await.context("Failed to run migrations")?;

    let events = EventPublisher::connect(config.nats_url.as_deref()).await;
    let cleanup = CleanupSettings {
        interval: Duration::from_secs(config.cleanup_interval_secs.max(1)),
        pending_order_ttl: chrono::Duration::minutes(config.pending_order_ttl_minutes),
    };
    let admin_seed = config.admin_seed.clone();
    let port = config.port;
    let state = AppState::new(db.clone(), config, events).context("Failed to initialise services")?;

    if let Some(seed) = admin_seed {
        match state.auth.seed_admin(&seed.email, &seed.password).await {
            Ok(true) => tracing::info!(email = %seed.email, "Admin account created"),
            Ok(false) => {}
            Err(e) => tracing::error!(error = %e, "Failed to seed admin account"),
        }
    }

    tokio::spawn(async move {
        stale_order_cleanup(db, cleanup).await;
        tracing::error!("Stale order cleanup exited unexpectedly");
    });

    let app = build_app(state);
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = tokio::net::TcpListener::bind(addr).await.with_context(|| format!("Failed to bind {}", addr))?;
    tracing::info!("Comix Commerce listening on {}", addr);

    axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>())
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("Received Ctrl+C, shutting down"),
        _ = terminate => tracing::info!("Received SIGTERM, shutting down"),
    }
}
