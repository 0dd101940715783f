//! Shared SQLite handle for the catalog and chat tables.
//!
//! One connection behind a mutex. Writers that touch several rows go through
//! [`Database::with_transaction`] so a failed step leaves nothing behind.

use std::path::Path;
use std::sync::Mutex;
use std::time::Duration;

use rusqlite::{Connection, Transaction};
use tracing::info;

use shopkeep_core::error::ShopkeepError;

use crate::migrations;

/// How long SQLite itself retries a locked database file before failing.
const BUSY_TIMEOUT: Duration = Duration::from_secs(2);

pub struct Database {
    conn: Mutex<Connection>,
}

impl Database {
    /// Open (or create) the database file at `path` and migrate it.
    pub fn new(path: &Path) -> Result<Self, ShopkeepError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)
            .map_err(|e| ShopkeepError::Storage(format!("Failed to open database: {}", e)))?;

        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA synchronous = NORMAL;
             PRAGMA foreign_keys = ON;
             PRAGMA cache_size = -16384;",
        )
        .map_err(|e| ShopkeepError::Storage(format!("Failed to set pragmas: {}", e)))?;
        conn.busy_timeout(BUSY_TIMEOUT)
            .map_err(|e| ShopkeepError::Storage(format!("Failed to set busy timeout: {}", e)))?;

        info!(path = %path.display(), "Database opened");

        let db = Self {
            conn: Mutex::new(conn),
        };
        db.with_conn(migrations::run_migrations)?;
        Ok(db)
    }

    /// Private in-memory database, used by tests and the API test harness.
    pub fn in_memory() -> Result<Self, ShopkeepError> {
        let conn = Connection::open_in_memory()
            .map_err(|e| ShopkeepError::Storage(format!("Failed to open in-memory db: {}", e)))?;

        conn.execute_batch("PRAGMA foreign_keys = ON;")
            .map_err(|e| ShopkeepError::Storage(format!("Failed to set pragmas: {}", e)))?;

        let db = Self {
            conn: Mutex::new(conn),
        };
        db.with_conn(migrations::run_migrations)?;
        Ok(db)
    }

    /// Run `f` with the connection locked.
    pub fn with_conn<F, T>(&self, f: F) -> Result<T, ShopkeepError>
    where
        F: FnOnce(&Connection) -> Result<T, ShopkeepError>,
    {
        let conn = self
            .conn
            .lock()
            .map_err(|e| ShopkeepError::Storage(format!("Database lock poisoned: {}", e)))?;
        f(&conn)
    }

    /// Run `f` inside one transaction, committing only if it returns `Ok`.
    ///
    /// An error from `f` or from the commit rolls every write back.
    pub fn with_transaction<F, T>(&self, f: F) -> Result<T, ShopkeepError>
    where
        F: FnOnce(&Transaction<'_>) -> Result<T, ShopkeepError>,
    {
        self.with_conn(|conn| {
            let tx = conn
                .unchecked_transaction()
                .map_err(|e| ShopkeepError::Storage(format!("Begin transaction: {}", e)))?;
            let value = f(&tx)?;
            tx.commit()
                .map_err(|e| ShopkeepError::Storage(format!("Commit: {}", e)))?;
            Ok(value)
        })
    }
}

impl std::fmt::Debug for Database {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Database").finish()
    }
}
