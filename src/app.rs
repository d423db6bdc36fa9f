use axum::extract::{FromRequestParts, State};
use std::fmt::Debug;
use std::ops::Deref;
use std::sync::Arc;

use crate::config;
use crate::db;

/// Shared server state handed to every request handler.
#[derive(Clone, FromRequestParts)]
#[from_request(via(State))]
#[must_use]
pub struct App(Arc<AppInner>);

pub struct AppInner {
    pub config: Arc<config::Server>,
    pub db: db::Pool,
}

impl App {
    /// Creates a new [`App`] from a given [configuration](config::Server).
    ///
    /// The database pool connects lazily; callers that require a live
    /// database should await [`db::Pool::wait_until_healthy`] afterwards.
    pub fn new(config: config::Server) -> Result<Self, db::Error> {
        let db = db::Pool::new(&config.db)?;
        Ok(Self(Arc::new(AppInner {
            config: Arc::new(config),
            db,
        })))
    }

    /// Creates a new [`App`] for testing purposes. The pool never
    /// connects unless a test actually touches the database.
    #[cfg(test)]
    pub fn new_for_tests() -> Self {
        Self::new(config::Server::for_tests()).unwrap()
    }

    /// Assembles an [`App`] from pre-built parts. Used by the test
    /// harness to wire in a per-test database pool.
    #[cfg(test)]
    pub(crate) fn from_parts_for_tests(config: config::Server, db: db::Pool) -> Self {
        Self(Arc::new(AppInner {
            config: Arc::new(config),
            db,
        }))
    }

    /// Obtains a read-only database connection from the pool.
    #[tracing::instrument(skip_all, name = "app.db_read")]
    pub async fn db_read(&self) -> Result<db::PoolConnection, db::Error> {
        self.db.get().await
    }

    /// Begins a read/write database transaction. The caller is
    /// responsible for committing; dropping the transaction rolls
    /// it back.
    #[tracing::instrument(skip_all, name = "app.db_write")]
    pub async fn db_write(&self) -> Result<db::Transaction<'static>, db::Error> {
        self.db.begin().await
    }
}

impl Debug for App {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("App")
            .field("config", &self.config)
            .field("db", &self.db)
            .finish()
    }
}

impl Deref for App {
    type Target = AppInner;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}
