//! DiveQuota server: site quota allocation engine.
//!
//! Wires the reservation store, snapshot cache and regulator adapter
//! into a [`QuotaEngine`] and keeps the pending-reservation sweeper
//! running until shutdown.

use std::sync::Arc;

use tokio::sync::watch;
use tracing_subscriber::{EnvFilter, fmt};

use divequota_authority::AuthorityDispatch;
use divequota_cache::CacheManager;
use divequota_core::config::AppConfig;
use divequota_core::error::AppError;
use divequota_core::traits::CacheProvider;
use divequota_database::DatabasePool;
use divequota_service::{PendingReservationSweeper, QuotaEngine};

#[tokio::main]
async fn main() {
    let env = std::env::var("DIVEQUOTA_ENV").unwrap_or_else(|_| "development".to_string());

    let config = match AppConfig::load(&env) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load configuration: {e}");
            std::process::exit(1);
        }
    };

    init_logging(&config);
    tracing::info!(env = %env, "Configuration loaded");

    if let Err(e) = run(config).await {
        tracing::error!(error = %e, "Server error");
        std::process::exit(1);
    }
}

/// Initialize tracing/logging
fn init_logging(config: &AppConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.logging.level));

    match config.logging.format.as_str() {
        "json" => {
            fmt()
                .json()
                .with_env_filter(filter)
                .with_target(true)
                .with_thread_ids(true)
                .init();
        }
        _ => {
            fmt()
                .pretty()
                .with_env_filter(filter)
                .with_target(true)
                .init();
        }
    }
}

async fn run(config: AppConfig) -> Result<(), AppError> {
    tracing::info!("Starting DiveQuota v{}", env!("CARGO_PKG_VERSION"));

    // ── Step 1: Reservation store + migrations ───────────────────
    let db = DatabasePool::connect(&config.database).await?;
    if !db.health_check().await? {
        return Err(AppError::database("Reservation store health check failed"));
    }
    divequota_database::migration::run_migrations(db.pool()).await?;
    tracing::info!("Database migrations complete");

    // ── Step 2: Snapshot cache ───────────────────────────────────
    let cache = CacheManager::new(&config.cache).await?;
    if !cache.health_check().await? {
        tracing::warn!(provider = %config.cache.provider, "Cache health check failed");
    }

    // ── Step 3: Regulator adapter ────────────────────────────────
    let authority = AuthorityDispatch::from_config(&config.srsa)?;

    // ── Step 4: Quota engine ─────────────────────────────────────
    let engine = Arc::new(QuotaEngine::new(
        config.srsa.clone(),
        Arc::new(db.site_directory()),
        Arc::new(db.reservation_store()),
        Arc::new(authority),
        Arc::new(cache),
    ));
    tracing::info!(
        authority = ?engine.authority_mode(),
        cache_ttl_secs = config.srsa.cache_ttl_seconds,
        "Quota engine ready"
    );

    // ── Step 5: Pending-reservation sweeper ──────────────────────
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let sweeper = PendingReservationSweeper::new(Arc::clone(&engine));
    let sweeper_handle = tokio::spawn(async move {
        sweeper.run(shutdown_rx).await;
    });

    // ── Step 6: Wait for shutdown ────────────────────────────────
    tokio::signal::ctrl_c()
        .await
        .map_err(|e| AppError::internal(format!("Failed to listen for shutdown signal: {e}")))?;
    tracing::info!("Shutdown signal received");

    let _ = shutdown_tx.send(true);
    if let Err(e) = sweeper_handle.await {
        tracing::error!(error = %e, "Sweeper task ended abnormally");
    }

    db.close().await;
    tracing::info!("DiveQuota stopped");
    Ok(())
}
