use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use tokio::signal;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use eduqr::audit::{spawn_audit_worker, AuditSink};
use eduqr::config::ServiceConfig;
use eduqr::db::ScheduleDb;
use eduqr::server::create_router;
use eduqr::types::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "eduqr=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config_path =
        PathBuf::from(std::env::var("EDUQR_CONFIG").unwrap_or_else(|_| "eduqr.json".to_string()));
    let config = ServiceConfig::load_or_default(&config_path)
        .map_err(|e| anyhow!("Failed to load config {}: {e}", config_path.display()))?;

    info!(database = %config.database.path, "Opening schedule database");
    let db = Arc::new(
        ScheduleDb::open(&config.database.path).context("Failed to open schedule database")?,
    );

    let (audit, audit_rx) = AuditSink::channel(config.audit.queue_capacity);
    let audit_worker = spawn_audit_worker(db.clone(), audit_rx);

    let address = config.bind_address();
    let state = Arc::new(AppState::new(db, config, audit));
    let app = create_router(state);

    let listener = tokio::net::TcpListener::bind(&address)
        .await
        .with_context(|| format!("Failed to bind to {address}"))?;
    info!("Listening on {}", address);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    // The router owned the last audit senders, so the worker drains and stops.
    if let Err(e) = audit_worker.await {
        error!("Audit worker ended abnormally: {}", e);
    }
    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = signal::ctrl_c().await {
        error!("Failed to listen for Ctrl+C: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Received Ctrl+C, shutting down");
}
