//! Database connection management

use sqlx::migrate::{MigrateError, Migrator};
use sqlx::postgres::{PgPool, PgPoolOptions};
use std::path::PathBuf;
use std::time::Duration;

/// PostgreSQL connection pool with embedded migrations.
pub struct Database {
    pool: PgPool,
}

impl Database {
    /// Create a new database connection pool.
    pub async fn connect(database_uri: &str) -> Result<Self, sqlx::Error> {
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .acquire_timeout(Duration::from_secs(5))
            .connect(database_uri)
            .await?;

        tracing::info!("PostgreSQL connection pool established");
        Ok(Self { pool })
    }

    /// Apply pending migrations from the `migrations/` directory. Runs
    /// before any worker starts; a failure here aborts process startup.
    pub async fn migrate(&self) -> Result<(), MigrateError> {
        let path = migrations_path();
        let migrator = Migrator::new(path.as_path()).await?;
        migrator.run(&self.pool).await?;
        tracing::info!(path = %path.display(), "database migrations applied");
        Ok(())
    }

    /// Get a reference to the connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Check database health.
    pub async fn health_check(&self) -> Result<(), sqlx::Error> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    /// Close the pool, waiting for checked-out connections to return.
    pub async fn close(&self) {
        self.pool.close().await;
        tracing::info!("database connection pool closed");
    }
}

/// `migrations/` under the working directory, falling back to the
/// directory next to the executable for packaged deployments.
fn migrations_path() -> PathBuf {
    let local = PathBuf::from("migrations");
    if local.is_dir() {
        return local;
    }

    std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(|dir| dir.join("migrations")))
        .filter(|candidate| candidate.is_dir())
        .unwrap_or(local)
}
