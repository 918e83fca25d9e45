use sqlx::{postgres::PgPoolOptions, PgPool};
use std::time::Duration;
use thiserror::Error;
use tracing::info;

use crate::config::DatabaseConfig;

/// Errors from the persistence layer
#[derive(Debug, Error)]
pub enum DatabaseError {
    #[error("Missing configuration: {0}")]
    ConfigMissing(&'static str),

    #[error("Invalid database URL")]
    InvalidDatabaseUrl,

    #[error("{0}")]
    Conflict(String),

    #[error("Query error: {0}")]
    QueryError(String),

    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
}

impl DatabaseError {
    /// Map a unique-index violation onto `Conflict`, keep everything else
    pub fn from_write(err: sqlx::Error, conflict_message: impl FnOnce() -> String) -> Self {
        if let sqlx::Error::Database(db) = &err {
            if db.code().as_deref() == Some("23505") {
                return DatabaseError::Conflict(conflict_message());
            }
        }
        DatabaseError::Sqlx(err)
    }
}

/// Explicitly constructed handle around the shared connection pool.
///
/// Created once at startup and handed to the stores; nothing in the crate
/// reaches for a process-wide pool.
#[derive(Clone)]
pub struct Database {
    pool: PgPool,
}

impl Database {
    /// Build the pool without opening a connection, so the server can start
    /// (and report itself degraded) while PostgreSQL is unreachable.
    pub fn connect_lazy(config: &DatabaseConfig) -> Result<Self, DatabaseError> {
        if config.url.trim().is_empty() {
            return Err(DatabaseError::ConfigMissing("DATABASE_URL"));
        }
        url::Url::parse(&config.url).map_err(|_| DatabaseError::InvalidDatabaseUrl)?;

        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(Duration::from_secs(config.connect_timeout_secs))
            .connect_lazy(&config.url)?;

        info!("Database pool configured for {}", config.redacted_url());
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    pub async fn close(&self) {
        self.pool.close().await;
        info!("Closed database pool");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;

    #[test]
    fn rejects_empty_url() {
        let mut config = AppConfig::development().database;
        config.url = "  ".to_string();
        assert!(matches!(
            Database::connect_lazy(&config),
            Err(DatabaseError::ConfigMissing("DATABASE_URL"))
        ));
    }

    #[test]
    fn rejects_unparseable_url() {
        let mut config = AppConfig::development().database;
        config.url = "not a url".to_string();
        assert!(matches!(Database::connect_lazy(&config), Err(DatabaseError::InvalidDatabaseUrl)));
    }
}
