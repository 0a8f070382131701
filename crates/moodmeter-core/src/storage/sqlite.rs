//! SQLite-backed document storage.

use std::path::Path;
use std::sync::Mutex;

use rusqlite::{params, Connection, OptionalExtension};

use super::DocumentStore;
use crate::error::StorageError;

/// Documents stored as rows of a single `documents` table.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open (and create if needed) the database at `path`.
    ///
    /// # Errors
    /// Returns an error if the database cannot be opened or migrated.
    pub fn open(path: &Path) -> Result<Self, StorageError> {
        let conn = Connection::open(path)?;
        Self::with_connection(conn)
    }

    /// Open an in-memory database.
    pub fn open_memory() -> Result<Self, StorageError> {
        let conn = Connection::open_in_memory()?;
        Self::with_connection(conn)
    }

    fn with_connection(conn: Connection) -> Result<Self, StorageError> {
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS documents (
                key         TEXT PRIMARY KEY,
                value       TEXT NOT NULL,
                updated_at  TEXT NOT NULL
            );",
        )?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Connection>, StorageError> {
        self.conn.lock().map_err(|_| StorageError::Locked)
    }
}

impl DocumentStore for SqliteStore {
    fn read(&self, key: &str) -> Result<Option<serde_json::Value>, StorageError> {
        let conn = self.lock()?;
        let raw: Option<String> = conn
            .query_row(
                "SELECT value FROM documents WHERE key = ?1",
                params![key],
                |row| row.get(0),
            )
            .optional()?;
        raw.map(|text| {
            serde_json::from_str(&text).map_err(|e| StorageError::Corrupt {
                key: key.to_string(),
                message: e.to_string(),
            })
        })
        .transpose()
    }

    fn write(&self, key: &str, value: &serde_json::Value) -> Result<(), StorageError> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT OR REPLACE INTO documents (key, value, updated_at) VALUES (?1, ?2, ?3)",
            params![key, value.to_string(), chrono::Utc::now().to_rfc3339()],
        )?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn document_roundtrip() {
        let store = SqliteStore::open_memory().unwrap();
        assert!(store.read("usage").unwrap().is_none());
        store.write("usage", &json!({"tokens": 1})).unwrap();
        store.write("usage", &json!({"tokens": 2})).unwrap();
        assert_eq!(store.read("usage").unwrap(), Some(json!({"tokens": 2})));
    }

    #[test]
    fn file_database_persists_across_opens() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("docs.db");
        SqliteStore::open(&path)
            .unwrap()
            .write("tags", &json!([]))
            .unwrap();
        let reopened = SqliteStore::open(&path).unwrap();
        assert_eq!(reopened.read("tags").unwrap(), Some(json!([])));
    }
}
