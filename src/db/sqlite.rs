//! SQLite-backed storage with a pooled connection per query.
//!
//! Every query runs on the blocking pool and is raced against both the
//! caller's cancellation token and a fixed per-statement deadline, so a slow
//! or abandoned request never pins a worker past its useful life.

use std::path::Path;
use std::time::Duration;

use r2d2_sqlite::SqliteConnectionManager;
use thiserror::Error;

use crate::context::RequestContext;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("user with this username already exists")]
    UserExists,
    #[error("no note with this id")]
    NoteNotFound,
    #[error("user has no notes")]
    NoNotes,
    #[error("operation was cancelled by the caller")]
    Cancelled,
    #[error("storage deadline exceeded")]
    DeadlineExceeded,
    #[error("connection pool error: {0}")]
    Pool(#[from] r2d2::Error),
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("storage worker failed: {0}")]
    Worker(String),
}

#[derive(Clone)]
pub struct Database {
    pool: r2d2::Pool<SqliteConnectionManager>,
    query_timeout: Duration,
}

impl Database {
    pub fn new(database_url: &str, query_timeout: Duration) -> Result<Self, StorageError> {
        if let Some(parent) = Path::new(database_url).parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)
                    .map_err(|e| StorageError::Worker(format!("create db directory: {e}")))?;
            }
        }

        let manager = SqliteConnectionManager::file(database_url).with_init(|conn| {
            conn.pragma_update(None, "journal_mode", "WAL")?;
            conn.pragma_update(None, "foreign_keys", "ON")?;
            conn.busy_timeout(Duration::from_secs(5))?;
            Ok(())
        });

        let pool = r2d2::Pool::new(manager)?;

        let conn = pool.get()?;
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS users (
                id         INTEGER PRIMARY KEY AUTOINCREMENT,
                username   TEXT NOT NULL UNIQUE,
                created_at TEXT NOT NULL
            );
            CREATE TABLE IF NOT EXISTS notes (
                id         INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id    INTEGER NOT NULL REFERENCES users(id),
                title      TEXT NOT NULL,
                content    TEXT,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_notes_user_created
                ON notes(user_id, created_at);",
        )?;
        drop(conn);

        log::info!("[DB] initialized sqlite storage at {database_url}");

        Ok(Self {
            pool,
            query_timeout,
        })
    }

    /// Run a blocking query against a pooled connection, racing it against
    /// the request's cancellation token and the per-statement deadline.
    ///
    /// An already-cancelled context never spawns a worker, and the worker
    /// re-checks the token after acquiring a connection, so a cancellation
    /// observed before the statement starts aborts without side effects.
    /// Only a cancel arriving mid-statement can still land the write.
    pub(crate) async fn run_query<T, F>(
        &self,
        ctx: &RequestContext,
        query: F,
    ) -> Result<T, StorageError>
    where
        F: FnOnce(&rusqlite::Connection) -> Result<T, StorageError> + Send + 'static,
        T: Send + 'static,
    {
        let pool = self.pool.clone();
        let cancel = ctx.cancel_token();
        if cancel.is_cancelled() {
            return Err(StorageError::Cancelled);
        }

        let worker_cancel = cancel.clone();
        let task = tokio::task::spawn_blocking(move || {
            let conn = pool.get()?;
            if worker_cancel.is_cancelled() {
                return Err(StorageError::Cancelled);
            }
            query(&conn)
        });

        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(StorageError::Cancelled),
            joined = tokio::time::timeout(self.query_timeout, task) => match joined {
                Err(_) => Err(StorageError::DeadlineExceeded),
                Ok(Ok(result)) => result,
                Ok(Err(join_err)) => Err(StorageError::Worker(join_err.to_string())),
            },
        }
    }
}
