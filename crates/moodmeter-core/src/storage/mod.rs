//! Durable document storage.
//!
//! Every record kind lives in one JSON document under a fixed key. Reads and
//! whole-document writes are the entire contract; the last writer wins.

mod config;
mod file;
mod sqlite;

pub use config::{AuthConfig, Backend, Config, FlowConfig, StorageConfig, UsageConfig};
pub use file::FileStore;
pub use sqlite::SqliteStore;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::StorageError;

/// Document keys.
pub mod keys {
    pub const TASKS: &str = "priorities";
    pub const TAGS: &str = "tags";
    pub const FLOWKEEPER: &str = "flowkeeper";
    pub const USAGE: &str = "usage";
    pub const COUNTER_FLOOR: &str = "counter_floor";
}

/// A last-write-wins JSON document store.
pub trait DocumentStore: Send + Sync {
    /// Read the document stored under `key`, if any.
    fn read(&self, key: &str) -> Result<Option<serde_json::Value>, StorageError>;

    /// Replace the document stored under `key`.
    fn write(&self, key: &str, value: &serde_json::Value) -> Result<(), StorageError>;
}

/// Read and decode a typed document.
pub fn read_typed<T: DeserializeOwned>(
    store: &dyn DocumentStore,
    key: &str,
) -> Result<Option<T>, StorageError> {
    match store.read(key)? {
        Some(value) => serde_json::from_value(value)
            .map(Some)
            .map_err(|e| StorageError::Corrupt {
                key: key.to_string(),
                message: e.to_string(),
            }),
        None => Ok(None),
    }
}

/// Encode and write a typed document.
pub fn write_typed<T: Serialize>(
    store: &dyn DocumentStore,
    key: &str,
    value: &T,
) -> Result<(), StorageError> {
    let json = serde_json::to_value(value).map_err(|e| StorageError::Corrupt {
        key: key.to_string(),
        message: e.to_string(),
    })?;
    store.write(key, &json)
}

/// Returns the data directory.
///
/// `MOODMETER_DATA_DIR` wins if set; otherwise `~/.config/moodmeter[-dev]/`
/// based on `MOODMETER_ENV` (set it to `dev` for a development directory).
///
/// # Errors
/// Returns an error if creating the directory fails.
pub fn data_dir() -> Result<PathBuf, StorageError> {
    let dir = match std::env::var_os("MOODMETER_DATA_DIR") {
        Some(dir) => PathBuf::from(dir),
        None => {
            let base_dir = dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".config");
            let env =
                std::env::var("MOODMETER_ENV").unwrap_or_else(|_| "production".to_string());
            if env == "dev" {
                base_dir.join("moodmeter-dev")
            } else {
                base_dir.join("moodmeter")
            }
        }
    };

    std::fs::create_dir_all(&dir).map_err(|e| StorageError::DataDir(e.to_string()))?;
    Ok(dir)
}

/// Open the configured backend rooted at `dir`.
pub fn open_store(backend: Backend, dir: &Path) -> Result<Arc<dyn DocumentStore>, StorageError> {
    Ok(match backend {
        Backend::File => Arc::new(FileStore::open(dir.join("documents"))?),
        Backend::Sqlite => Arc::new(SqliteStore::open(&dir.join("moodmeter.db"))?),
    })
}
