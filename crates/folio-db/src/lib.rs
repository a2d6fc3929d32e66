pub mod documents;
pub mod error;
pub mod migrations;
pub mod models;
pub mod photos;

use rusqlite::{Connection, Transaction};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use tracing::info;

pub use error::DbError;

pub type Result<T, E = DbError> = std::result::Result<T, E>;

/// Single SQLite connection shared by every caller.
///
/// Writes are serialized by the mutex; anything that touches more than one
/// row goes through [`Database::with_tx`].
pub struct Database {
    conn: Mutex<Connection>,
}

impl Database {
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)?;

        // WAL mode for concurrent reads
        conn.pragma_update(None, "journal_mode", "WAL")?;

        let db = Self::prepare(conn)?;
        info!("Database opened at {}", path.display());
        Ok(db)
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::prepare(Connection::open_in_memory()?)
    }

    fn prepare(conn: Connection) -> Result<Self> {
        conn.pragma_update(None, "foreign_keys", "ON")?;
        migrations::run(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| DbError::LockPoisoned(e.to_string()))
    }

    pub fn with_conn<F, T, E>(&self, f: F) -> Result<T, E>
    where
        F: FnOnce(&Connection) -> Result<T, E>,
        E: From<DbError>,
    {
        let conn = self.lock()?;
        f(&conn)
    }

    /// Run `f` inside one transaction. Commits when `f` returns `Ok`;
    /// any error drops the transaction, which rolls it back.
    pub fn with_tx<F, T, E>(&self, f: F) -> Result<T, E>
    where
        F: FnOnce(&Transaction<'_>) -> Result<T, E>,
        E: From<DbError>,
    {
        let mut conn = self.lock()?;
        let tx = conn.transaction().map_err(DbError::from)?;
        let value = f(&tx)?;
        tx.commit().map_err(DbError::from)?;
        Ok(value)
    }
}

/// Extension trait for optional query results
pub(crate) trait OptionalExt<T> {
    fn optional(self) -> Result<Option<T>>;
}

impl<T> OptionalExt<T> for std::result::Result<T, rusqlite::Error> {
    fn optional(self) -> Result<Option<T>> {
        match self {
            Ok(val) => Ok(Some(val)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failed_transaction_rolls_back() {
        let db = Database::open_in_memory().unwrap();

        let result: Result<()> = db.with_tx(|tx| {
            documents::insert_document(tx, Some("draft"), None)?;
            Err(DbError::NotFound {
                entity: "photo",
                id: 99,
            })
        });
        assert!(matches!(result, Err(DbError::NotFound { id: 99, .. })));

        let count = db.with_conn(|conn| documents::count_documents(conn)).unwrap();
        assert_eq!(count, 0);
    }

    #[test]
    fn committed_transaction_is_visible() {
        let db = Database::open_in_memory().unwrap();

        let id = db
            .with_tx(|tx| documents::insert_document(tx, Some("kept"), Some("body")))
            .unwrap();

        let row = db
            .with_conn(|conn| documents::get_document(conn, id))
            .unwrap()
            .unwrap();
        assert_eq!(row.title.as_deref(), Some("kept"));
    }

    #[test]
    fn open_on_disk_applies_schema() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("folio.db");

        {
            let db = Database::open(&path).unwrap();
            db.with_tx(|tx| documents::insert_document(tx, Some("persisted"), None))
                .unwrap();
        }

        let db = Database::open(&path).unwrap();
        let version = db.with_conn(|conn| migrations::schema_version(conn)).unwrap();
        assert_eq!(version, migrations::LATEST_VERSION);
        let count = db.with_conn(|conn| documents::count_documents(conn)).unwrap();
        assert_eq!(count, 1);
    }
}
