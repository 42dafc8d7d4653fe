pub mod config;
pub mod operations;
pub mod schema;

use std::str::FromStr;
use std::time::{Duration, Instant};

use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Sqlite, SqlitePool, Transaction};
use thiserror::Error;

use crate::db::config::{DbConfig, DbConfigError};

/// Storage handle shared by the catalog store and the progress ledger. Cloning is cheap;
/// every clone talks to the same pool.
#[derive(Clone)]
pub struct Database {
    config: DbConfig,
    pool: SqlitePool,
}

impl Database {
    pub async fn from_env() -> Result<Self, DbInitError> {
        let config = DbConfig::from_env()?;
        Self::connect(config).await
    }

    pub async fn in_memory() -> Result<Self, DbInitError> {
        Self::connect(DbConfig::in_memory()).await
    }

    pub async fn connect(config: DbConfig) -> Result<Self, DbInitError> {
        if let Some(parent) = sqlite_file_parent(&config.url) {
            std::fs::create_dir_all(&parent).map_err(|err| DbInitError::Io {
                path: parent.display().to_string(),
                message: err.to_string(),
            })?;
        }

        let options = SqliteConnectOptions::from_str(&config.url)?
            .create_if_missing(true)
            .journal_mode(config.journal_mode.to_sqlx())
            .busy_timeout(config.busy_timeout)
            .foreign_keys(config.foreign_keys);

        let mut pool_options = SqlitePoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(Duration::from_secs(5));

        if config.is_in_memory() {
            pool_options = pool_options
                .min_connections(1)
                .idle_timeout(None)
                .max_lifetime(None);
        }

        let pool = pool_options.connect_with(options).await?;
        schema::run_migrations(&pool).await?;

        tracing::info!(
            url = %config.url,
            max_connections = config.max_connections,
            "database ready"
        );

        Ok(Self { config, pool })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub fn config(&self) -> &DbConfig {
        &self.config
    }

    /// Opens a transaction that already holds the store's writer lock. A deferred
    /// transaction that reads before its first write fails with `SQLITE_BUSY_SNAPSHOT`,
    /// without waiting on the busy timeout, if another writer commits in between.
    pub async fn begin_write(&self) -> Result<Transaction<'static, Sqlite>, sqlx::Error> {
        let mut tx = self.pool.begin().await?;
        sqlx::query(
            r#"UPDATE "_db_metadata" SET "value" = "value" WHERE "key" = 'schema_version'"#,
        )
        .execute(&mut *tx)
        .await?;
        Ok(tx)
    }

    pub async fn ping(&self, timeout: Duration) -> DbHealth {
        let started = Instant::now();
        let result = tokio::time::timeout(timeout, sqlx::query("SELECT 1").execute(&self.pool)).await;

        match result {
            Ok(Ok(_)) => DbHealth::Connected {
                latency_ms: started.elapsed().as_millis() as u64,
            },
            Ok(Err(err)) => {
                tracing::warn!(error = %err, "database health check failed");
                DbHealth::Disconnected
            }
            Err(_) => DbHealth::Timeout,
        }
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DbHealth {
    Connected { latency_ms: u64 },
    Timeout,
    Disconnected,
}

fn sqlite_file_parent(url: &str) -> Option<std::path::PathBuf> {
    if url.contains(":memory:") {
        return None;
    }
    let path = url
        .trim_start_matches("sqlite://")
        .trim_start_matches("sqlite:");
    let path = path.split('?').next().unwrap_or_default();
    std::path::Path::new(path)
        .parent()
        .filter(|parent| !parent.as_os_str().is_empty())
        .map(|parent| parent.to_path_buf())
}

#[derive(Debug, Error)]
pub enum DbInitError {
    #[error(transparent)]
    Config(#[from] DbConfigError),
    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
    #[error("failed to create database directory {path}: {message}")]
    Io { path: String, message: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_parent_is_resolved_from_url() {
        assert_eq!(
            sqlite_file_parent("sqlite://./data/progress.db"),
            Some(std::path::PathBuf::from("./data"))
        );
        assert_eq!(
            sqlite_file_parent("sqlite:/tmp/x/progress.db?mode=rwc"),
            Some(std::path::PathBuf::from("/tmp/x"))
        );
        assert_eq!(sqlite_file_parent("sqlite::memory:"), None);
        assert_eq!(sqlite_file_parent("sqlite://progress.db"), None);
    }
}
