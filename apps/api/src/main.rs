//! # Emporium API
//!
//! HTTP server for the storefront plus the payment notification worker.
//!
//! ## Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                          Emporium API Server                            │
//! │                                                                         │
//! │  Client ───► HTTP (8080) ───► Handlers ───► emporium-orders ───► SQLite │
//! │                                   │                                 ▲   │
//! │  Midtrans ──► /payment/... ───────┘ wake                            │   │
//! │                                     ▼                               │   │
//! │                            NotificationWorker ──────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use emporium_api::auth::JwtManager;
use emporium_api::config::ApiConfig;
use emporium_api::{router, AppState};
use emporium_db::{Database, DbConfig};
use emporium_orders::{
    CheckoutService, CommerceConfig, InvoiceGenerator, MemoryCache, MidtransSnapClient, NotificationReconciler,
    NotificationWorker, PaymentGateway, ShippingCalculator,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,emporium=debug,sqlx=warn")),
        )
        .with_target(true)
        .with_thread_ids(true)
        .init();

    info!("Starting Emporium API server...");

    // Load configuration
    let config = ApiConfig::load()?;
    let commerce = CommerceConfig::load(config.commerce_config_path.clone())?;
    info!(
        port = config.http_port,
        database = %config.database_path.display(),
        production = commerce.midtrans.is_production,
        "Configuration loaded"
    );

    // Connect to database (migrations run on connect)
    let db = Database::new(DbConfig::new(&config.database_path))
        .await
        .context("failed to open database")?;

    // Services
    let shipping = ShippingCalculator::new(
        db.clone(),
        Arc::new(MemoryCache::new()),
        Duration::from_secs(commerce.shipping.zone_cache_ttl_secs),
    );
    let checkout = CheckoutService::new(db.clone(), shipping.clone(), Arc::new(InvoiceGenerator::new()));
    let snap = MidtransSnapClient::new(&commerce.midtrans)?;
    info!(endpoint = snap.endpoint(), "Snap client ready");
    let gateway = PaymentGateway::new(db.clone(), Arc::new(snap), commerce.midtrans.is_3ds);

    // Notification worker
    let reconciler = Arc::new(NotificationReconciler::new(db.clone(), commerce.midtrans.server_key.clone()));
    let (worker, worker_handle) = NotificationWorker::new(db.notifications(), reconciler, commerce.worker.clone());
    let worker_task = tokio::spawn(worker.run());

    let state = AppState {
        db: db.clone(),
        checkout,
        gateway,
        shipping,
        jwt: Arc::new(JwtManager::new(&config.jwt_secret)),
        worker: worker_handle.clone(),
    };

    let addr = SocketAddr::from(([0, 0, 0, 0], config.http_port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;
    info!(%addr, "Listening");

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    if let Err(e) = worker_handle.shutdown().await {
        warn!(error = %e, "Notification worker already stopped");
    }
    if let Err(e) = worker_task.await {
        warn!(error = %e, "Notification worker task failed");
    }
    db.close().await;

    info!("Server shutdown complete");
    Ok(())
}

/// Graceful shutdown signal handler.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received, starting graceful shutdown...");
}
