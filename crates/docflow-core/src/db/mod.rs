//! SQLite database layer for the Docflow backend.
//!
//! Uses rusqlite with WAL mode for concurrent read performance.
//! All database operations are executed via `tokio::task::spawn_blocking`
//! to avoid blocking the async runtime.

use rusqlite::{Connection, Transaction};
use std::path::Path;
use std::sync::{Arc, Mutex};

use crate::error::ServerError;

/// Thread-safe handle to the SQLite database.
#[derive(Clone)]
pub struct Database {
    conn: Arc<Mutex<Connection>>,
}

impl Database {
    /// Open (or create) a SQLite database at the given path.
    pub fn open(db_path: &str) -> Result<Self, ServerError> {
        let path = Path::new(db_path);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).ok();
        }

        let conn = Connection::open(db_path)
            .map_err(|e| ServerError::Database(format!("Failed to open database: {}", e)))?;

        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;")
            .map_err(|e| ServerError::Database(format!("Failed to set pragmas: {}", e)))?;

        let db = Self {
            conn: Arc::new(Mutex::new(conn)),
        };

        db.initialize_tables()?;

        tracing::info!("SQLite database opened at: {}", db_path);
        Ok(db)
    }

    /// Open an in-memory database (for testing).
    pub fn open_in_memory() -> Result<Self, ServerError> {
        let conn = Connection::open_in_memory()
            .map_err(|e| ServerError::Database(format!("Failed to open in-memory db: {}", e)))?;

        conn.execute_batch("PRAGMA foreign_keys=ON;")
            .map_err(|e| ServerError::Database(format!("Failed to set pragmas: {}", e)))?;

        let db = Self {
            conn: Arc::new(Mutex::new(conn)),
        };

        db.initialize_tables()?;
        Ok(db)
    }

    /// Execute a closure with access to the database connection.
    /// Automatically handles locking and error conversion.
    pub fn with_conn<F, T>(&self, f: F) -> Result<T, ServerError>
    where
        F: FnOnce(&Connection) -> Result<T, rusqlite::Error>,
    {
        let conn = self
            .conn
            .lock()
            .map_err(|e| ServerError::Database(format!("Lock poisoned: {}", e)))?;
        f(&conn).map_err(|e| ServerError::Database(e.to_string()))
    }

    /// Execute a closure with access to the database connection (async-friendly).
    pub async fn with_conn_async<F, T>(&self, f: F) -> Result<T, ServerError>
    where
        F: FnOnce(&Connection) -> Result<T, rusqlite::Error> + Send + 'static,
        T: Send + 'static,
    {
        let db = self.clone();
        tokio::task::spawn_blocking(move || db.with_conn(f))
            .await
            .map_err(|e| ServerError::Database(format!("Task join error: {}", e)))?
    }

    /// Run a closure inside a transaction. Commits on `Ok`, rolls back on `Err`.
    ///
    /// The closure may fail with any `ServerError` (e.g. a workflow
    /// violation), not only database errors.
    pub fn with_tx<F, T>(&self, f: F) -> Result<T, ServerError>
    where
        F: FnOnce(&Transaction<'_>) -> Result<T, ServerError>,
    {
        let mut conn = self
            .conn
            .lock()
            .map_err(|e| ServerError::Database(format!("Lock poisoned: {}", e)))?;
        let tx = conn.transaction()?;
        let value = f(&tx)?;
        tx.commit()?;
        Ok(value)
    }

    /// Transactional counterpart of [`Database::with_conn_async`].
    pub async fn with_tx_async<F, T>(&self, f: F) -> Result<T, ServerError>
    where
        F: FnOnce(&Transaction<'_>) -> Result<T, ServerError> + Send + 'static,
        T: Send + 'static,
    {
        let db = self.clone();
        tokio::task::spawn_blocking(move || db.with_tx(f))
            .await
            .map_err(|e| ServerError::Database(format!("Task join error: {}", e)))?
    }

    /// Create all tables if they don't exist.
    fn initialize_tables(&self) -> Result<(), ServerError> {
        self.with_conn(|conn| {
            conn.execute_batch(
                "
                CREATE TABLE IF NOT EXISTS users (
                    id              TEXT PRIMARY KEY,
                    username        TEXT NOT NULL UNIQUE,
                    email           TEXT,
                    created_at      INTEGER NOT NULL
                );

                CREATE TABLE IF NOT EXISTS user_groups (
                    user_id         TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                    group_name      TEXT NOT NULL,
                    PRIMARY KEY (user_id, group_name)
                );
                CREATE INDEX IF NOT EXISTS idx_user_groups_group ON user_groups(group_name);

                CREATE TABLE IF NOT EXISTS documents (
                    id                  TEXT PRIMARY KEY,
                    field1              TEXT,
                    field2              TEXT,
                    field3              TEXT,
                    field4              TEXT,
                    field5              TEXT,
                    field6              TEXT,
                    field7              TEXT,
                    field8              TEXT,
                    field9              TEXT,
                    field10             TEXT,
                    field11             TEXT,
                    current_stage       TEXT NOT NULL DEFAULT 'FILLING',
                    current_filler_step INTEGER NOT NULL DEFAULT 1,
                    created_by          TEXT REFERENCES users(id) ON DELETE CASCADE,
                    version             INTEGER NOT NULL DEFAULT 1,
                    created_at          INTEGER NOT NULL,
                    updated_at          INTEGER NOT NULL
                );
                CREATE INDEX IF NOT EXISTS idx_documents_created ON documents(created_at);

                CREATE TABLE IF NOT EXISTS approval_records (
                    id              TEXT PRIMARY KEY,
                    document_id     TEXT NOT NULL REFERENCES documents(id) ON DELETE CASCADE,
                    approver_id     TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                    status          TEXT NOT NULL DEFAULT 'PENDING',
                    comments        TEXT,
                    approved_at     INTEGER,
                    created_at      INTEGER NOT NULL,
                    UNIQUE (document_id, approver_id)
                );
                CREATE INDEX IF NOT EXISTS idx_approval_records_document ON approval_records(document_id);
                ",
            )
        })
    }
}
