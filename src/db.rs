use sqlx::postgres::{PgConnectOptions, PgPoolOptions, PgSslMode};
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

use crate::config;

pub type Transaction<'a> = sqlx::Transaction<'a, sqlx::Postgres>;
pub type PoolConnection = sqlx::pool::PoolConnection<sqlx::Postgres>;
pub type Connection = sqlx::PgConnection;

pub static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!();

/// Database related errors
#[derive(Debug, Error)]
pub enum Error {
    /// An error caused by an invalid Postgres connection URL.
    #[error("invalid connection url")]
    InvalidUrl,
    /// An error caused by an [`sqlx`] error.
    #[error("received a database error: {0}")]
    Internal(sqlx::Error),
    /// The pool does not have a reliable connection to the database.
    #[error("unhealthy database pool")]
    UnhealthyPool,
    #[error("could not run pending migrations")]
    Migrate(#[from] sqlx::migrate::MigrateError),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Converts from a generic [sqlx] result into a [database compatible error](Error).
pub trait ErrorExt<T> {
    fn into_db_error(self) -> Result<T>;
}

impl<T> ErrorExt<T> for std::result::Result<T, sqlx::Error> {
    fn into_db_error(self) -> Result<T> {
        self.map_err(Error::Internal)
    }
}

pub trait SqlxErrorExt {
    fn is_unique_violation(&self) -> bool;
}

impl SqlxErrorExt for sqlx::Error {
    fn is_unique_violation(&self) -> bool {
        match self {
            sqlx::Error::Database(inner) => {
                matches!(inner.kind(), sqlx::error::ErrorKind::UniqueViolation)
            }
            _ => false,
        }
    }
}

impl SqlxErrorExt for Error {
    fn is_unique_violation(&self) -> bool {
        match self {
            Self::Internal(inner) => inner.is_unique_violation(),
            _ => false,
        }
    }
}

#[derive(Clone)]
pub struct Pool {
    pool: sqlx::PgPool,
}

impl Pool {
    /// Builds a lazily connecting pool from the database configuration.
    ///
    /// The pool is not considered an error if the database cannot be
    /// reached yet; callers that need a live database should follow up
    /// with [`Pool::wait_until_healthy`].
    pub fn new(cfg: &config::Database) -> Result<Self> {
        let mut pool_opts = PgPoolOptions::new()
            .acquire_timeout(Duration::from_secs(cfg.timeout_secs.get()))
            .max_connections(cfg.pool_size.get());

        if let Some(min_idle) = cfg.min_idle {
            pool_opts = pool_opts.min_connections(min_idle.get());
        }

        let mut connect_opts =
            PgConnectOptions::from_str(&cfg.url).map_err(|_| Error::InvalidUrl)?;

        if cfg.enforce_tls {
            connect_opts = connect_opts.ssl_mode(PgSslMode::Prefer);
        }

        Ok(Self {
            pool: pool_opts.connect_lazy_with(connect_opts),
        })
    }

    #[inline]
    pub fn connections(&self) -> u32 {
        self.pool.size()
    }

    #[inline]
    pub fn is_healthy(&self) -> bool {
        self.connections() > 0
    }

    #[tracing::instrument(name = "db.transaction", skip_all)]
    pub async fn begin(&self) -> Result<Transaction<'static>> {
        self.pool.begin().await.into_db_error()
    }

    #[tracing::instrument(name = "db.connect", skip_all)]
    pub async fn get(&self) -> Result<PoolConnection> {
        self.pool.acquire().await.into_db_error()
    }

    #[tracing::instrument(skip_all)]
    pub async fn wait_until_healthy(&self) -> Result<()> {
        match self.pool.acquire().await {
            Ok(..) => Ok(()),
            Err(..) if !self.is_healthy() => Err(Error::UnhealthyPool),
            Err(error) => Err(Error::Internal(error)),
        }
    }

    /// Runs any pending embedded migrations.
    #[tracing::instrument(name = "db.migrate", skip_all)]
    pub async fn run_pending_migrations(&self) -> Result<()> {
        tracing::info!("running pending database migrations");
        MIGRATOR.run(&self.pool).await?;
        Ok(())
    }
}

impl std::fmt::Debug for Pool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pool")
            .field("connections", &self.connections())
            .finish_non_exhaustive()
    }
}
