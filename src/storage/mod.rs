//! Durable key/value storage and the stores built on top of it
//!
//! Every piece of persisted state is a single string value under a fixed
//! key. [`SledStore`] keeps them in an embedded `sled` database in the
//! data directory and flushes after every write; [`MemoryStore`] keeps
//! values in a map and is what tests use.

use crate::config::StorageConfig;
use crate::error::{QuantumError, Result};
use directories::ProjectDirs;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

pub mod activity;
pub mod sessions;
pub mod settings;
pub mod types;

pub use activity::ActivityLog;
pub use sessions::{DeleteOutcome, SessionStore};
pub use settings::Settings;
pub use types::{ActivityEntry, Session, SessionSummary};

/// Key holding the JSON array of sessions
pub const CHATS_KEY: &str = "quantumChats";
/// Key holding the selected model identifier
pub const MODEL_KEY: &str = "groqModel";
/// Key holding the API credential
pub const API_KEY_KEY: &str = "groqApiKey";
/// Key holding the activity log
pub const ACTIVITY_KEY: &str = "quantumActivity";

const DB_FILE_NAME: &str = "quantum-chat.db";

/// String values under string keys, read and written whole
pub trait KeyValueStore: Send + Sync {
    /// Read a value; `None` when the key has never been written
    fn get(&self, key: &str) -> Result<Option<String>>;

    /// Overwrite a value unconditionally
    fn set(&self, key: &str, value: &str) -> Result<()>;

    /// Remove a value; removing an absent key is not an error
    fn remove(&self, key: &str) -> Result<()>;
}

/// Embedded `sled` database holding one value per key
#[derive(Clone)]
pub struct SledStore {
    db: sled::Db,
    path: PathBuf,
}

impl SledStore {
    /// Open the store in the platform data directory
    ///
    /// # Returns
    ///
    /// Returns a store backed by `<data dir>/quantum-chat.db`
    ///
    /// # Errors
    ///
    /// Returns `QuantumError::Storage` if the data directory cannot be
    /// determined or the database cannot be opened
    pub fn new() -> Result<Self> {
        let proj_dirs = ProjectDirs::from("com", "quantum", "quantum-chat")
            .ok_or_else(|| QuantumError::Storage("Could not determine data directory".into()))?;
        Self::new_with_path(proj_dirs.data_dir())
    }

    /// Open or create the store inside a specific directory
    ///
    /// # Arguments
    ///
    /// * `dir` - Directory that holds the database; created if missing
    ///
    /// # Errors
    ///
    /// Returns `QuantumError::Storage` if the database cannot be opened,
    /// for example because another process holds it
    ///
    /// # Examples
    ///
    /// ```
    /// use quantum_chat::storage::{KeyValueStore, SledStore};
    ///
    /// let dir = tempfile::tempdir().unwrap();
    /// let store = SledStore::new_with_path(dir.path()).unwrap();
    /// store.set("groqModel", "gemma2-9b-it").unwrap();
    /// assert_eq!(store.get("groqModel").unwrap().as_deref(), Some("gemma2-9b-it"));
    /// ```
    pub fn new_with_path<P: AsRef<Path>>(dir: P) -> Result<Self> {
        let path = dir.as_ref().join(DB_FILE_NAME);
        let db = sled::open(&path)
            .map_err(|e| QuantumError::Storage(format!("Failed to open database: {}", e)))?;
        tracing::debug!(path = %path.display(), "Opened chat database");
        Ok(Self { db, path })
    }

    /// Open the store described by the storage configuration
    pub fn from_config(config: &StorageConfig) -> Result<Self> {
        match &config.data_dir {
            Some(dir) => Self::new_with_path(dir),
            None => Self::new(),
        }
    }

    /// Location of the database on disk
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn flush(&self) -> Result<()> {
        self.db
            .flush()
            .map_err(|e| QuantumError::Storage(format!("Flush failed: {}", e)))?;
        Ok(())
    }
}

impl KeyValueStore for SledStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        match self
            .db
            .get(key.as_bytes())
            .map_err(|e| QuantumError::Storage(format!("Get failed: {}", e)))?
        {
            Some(bytes) => {
                let value = String::from_utf8(bytes.to_vec()).map_err(|e| {
                    QuantumError::Storage(format!("Value under {} is not UTF-8: {}", key, e))
                })?;
                Ok(Some(value))
            }
            None => Ok(None),
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.db
            .insert(key.as_bytes(), value.as_bytes())
            .map_err(|e| QuantumError::Storage(format!("Insert failed: {}", e)))?;
        self.flush()
    }

    fn remove(&self, key: &str) -> Result<()> {
        self.db
            .remove(key.as_bytes())
            .map_err(|e| QuantumError::Storage(format!("Remove failed: {}", e)))?;
        self.flush()
    }
}

/// In-process store; contents vanish with the value
#[derive(Debug, Default)]
pub struct MemoryStore {
    values: RwLock<HashMap<String, String>>,
}

impl MemoryStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let values = self
            .values
            .read()
            .map_err(|_| QuantumError::Storage("memory store lock poisoned".into()))?;
        Ok(values.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let mut values = self
            .values
            .write()
            .map_err(|_| QuantumError::Storage("memory store lock poisoned".into()))?;
        values.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        let mut values = self
            .values
            .write()
            .map_err(|_| QuantumError::Storage("memory store lock poisoned".into()))?;
        values.remove(key);
        Ok(())
    }
}
