//! Application wiring: database, stores, services, pipeline, gateway,
//! and the explicit shutdown sequence.

use anyhow::{Context, Result};
use std::future::IntoFuture;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tracing::{info, warn};

use crate::auth::JwtManager;
use crate::client::AccrualClient;
use crate::config::Config;
use crate::gateway::{self, state::AppState};
use crate::pipeline::{Pipeline, PipelineConfig};
use crate::service::{AuthService, BalanceService, OrderService};
use crate::store::{Database, PgLedgerStore, PgOrderStore, PgUserStore};

const SERVER_DRAIN_TIMEOUT: Duration = Duration::from_secs(10);

/// Run the service until SIGINT/SIGTERM, then shut down in order:
/// scheduler, status workers, accrual workers, HTTP server, pool.
pub async fn run(config: Config) -> Result<()> {
    if config.secret_key.is_empty() {
        warn!("SECRET_KEY is empty; tokens are signed with an empty secret");
    }

    let db = Database::connect(&config.database_uri)
        .await
        .context("connect to database")?;
    db.migrate().await.context("apply migrations")?;

    let users = Arc::new(PgUserStore::new(db.pool().clone()));
    let orders = Arc::new(PgOrderStore::new(db.pool().clone()));
    let ledger = Arc::new(PgLedgerStore::new(db.pool().clone()));

    let accrual = Arc::new(
        AccrualClient::new(config.accrual_address.clone()).context("build accrual client")?,
    );

    let pipeline = Pipeline::spawn(
        orders.clone(),
        ledger.clone(),
        accrual,
        PipelineConfig::from_config(&config),
    );

    let jwt = JwtManager::new(&config.secret_key, config.jwt_expiry);
    let state = Arc::new(AppState {
        auth: AuthService::new(users, jwt.clone()),
        orders: OrderService::new(orders),
        balance: BalanceService::new(ledger),
        jwt,
    });

    let listener = TcpListener::bind(&config.run_address)
        .await
        .with_context(|| format!("bind {}", config.run_address))?;
    info!(address = %config.run_address, "HTTP server listening");

    let (close_tx, close_rx) = tokio::sync::oneshot::channel::<()>();
    let server = axum::serve(listener, gateway::router(state))
        .with_graceful_shutdown(async {
            let _ = close_rx.await;
        });
    let server_task = tokio::spawn(server.into_future());

    shutdown_signal().await;
    info!("shutdown signal received");

    // the pipeline first: the scheduler must stop producing before its
    // queue closes, and both pools drain what is already buffered
    pipeline.shutdown().await;

    let _ = close_tx.send(());
    match tokio::time::timeout(SERVER_DRAIN_TIMEOUT, server_task).await {
        Ok(Ok(Ok(()))) => info!("HTTP server stopped gracefully"),
        Ok(Ok(Err(e))) => warn!(error = %e, "HTTP server exited with error"),
        Ok(Err(e)) => warn!(error = %e, "HTTP server task panicked"),
        Err(_) => warn!("HTTP server drain timed out"),
    }

    db.close().await;
    info!("shutdown completed");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("install SIGINT handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
