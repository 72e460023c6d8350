//! Storage layer for the local backend
//!
//! All state lives under one data directory inside the root:
//!
//! ```text
//! <root>/
//!   .taskdesk.toml               # Configuration (optional)
//!   .taskdesk/                   # Data directory (backend.data_dir)
//!     identity/
//!       accounts.json            # Credential registry
//!       session.json             # Signed-in principal of this client
//!     store/
//!       users.lock               # Write lock for the users collection
//!       users/<id>.json          # Profile documents
//!       tasks.lock
//!       tasks/<id>.json          # Task documents
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use serde::{de::DeserializeOwned, Serialize};

use crate::config::Config;
use crate::error::{Error, Result};
use crate::lock::{self, FileLock};

/// Name of the configuration file in the root
pub const CONFIG_FILE: &str = ".taskdesk.toml";

/// Storage manager for taskdesk state
#[derive(Debug, Clone)]
pub struct Storage {
    /// Resolved data directory
    data_dir: PathBuf,
    /// Lock wait bound for writes
    timeout_ms: u64,
}

impl Storage {
    pub fn new(root: PathBuf, config: &Config) -> Self {
        let data_dir = root.join(&config.backend.data_dir);
        Self {
            data_dir,
            timeout_ms: config.backend.timeout_ms,
        }
    }

    // =========================================================================
    // Path accessors
    // =========================================================================

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn identity_dir(&self) -> PathBuf {
        self.data_dir.join("identity")
    }

    pub fn accounts_file(&self) -> PathBuf {
        self.identity_dir().join("accounts.json")
    }

    pub fn session_file(&self) -> PathBuf {
        self.identity_dir().join("session.json")
    }

    pub fn store_dir(&self) -> PathBuf {
        self.data_dir.join("store")
    }

    pub fn collection_dir(&self, collection: &str) -> PathBuf {
        self.store_dir().join(collection)
    }

    pub fn document_file(&self, collection: &str, id: &str) -> PathBuf {
        self.collection_dir(collection).join(format!("{id}.json"))
    }

    /// Lock file for a collection; sits beside the directory, not in it
    pub fn collection_lock_file(&self, collection: &str) -> PathBuf {
        self.store_dir().join(format!("{collection}.lock"))
    }

    // =========================================================================
    // Initialization
    // =========================================================================

    /// Create the data directory layout; returns true if anything was created
    pub fn init(&self) -> Result<bool> {
        let created = !self.data_dir.exists();
        fs::create_dir_all(self.identity_dir())?;
        fs::create_dir_all(self.store_dir())?;
        Ok(created)
    }

    pub fn is_initialized(&self) -> bool {
        self.store_dir().exists()
    }

    pub fn ensure_initialized(&self) -> Result<()> {
        if self.is_initialized() {
            Ok(())
        } else {
            Err(Error::NotInitialized(self.data_dir.clone()))
        }
    }

    // =========================================================================
    // JSON helpers
    // =========================================================================

    /// Acquire the write lock guarding `path`
    pub fn lock(&self, path: &Path) -> Result<FileLock> {
        FileLock::acquire(lock::lock_path_for(path), self.timeout_ms)
    }

    /// Acquire the write lock shared by every document in `collection`
    pub fn lock_collection(&self, collection: &str) -> Result<FileLock> {
        FileLock::acquire(self.collection_lock_file(collection), self.timeout_ms)
    }

    /// Write JSON atomically; the caller holds the lock for `path`
    pub fn write_json<T: Serialize>(&self, path: &Path, data: &T) -> Result<()> {
        let json = serde_json::to_string_pretty(data)?;
        lock::write_atomic(path, json.as_bytes())
    }

    /// Write JSON atomically, taking the lock for the duration of the write
    pub fn write_json_locked<T: Serialize>(&self, path: &Path, data: &T) -> Result<()> {
        let json = serde_json::to_string_pretty(data)?;
        lock::write_atomic_locked(path, json.as_bytes(), self.timeout_ms)
    }

    /// Read JSON, mapping a missing file to `None`
    pub fn read_json_opt<T: DeserializeOwned>(&self, path: &Path) -> Result<Option<T>> {
        match fs::read_to_string(path) {
            Ok(content) => Ok(Some(serde_json::from_str(&content)?)),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(Error::Io(err)),
        }
    }

    /// Remove a file; returns false when it did not exist
    pub fn remove_file(&self, path: &Path) -> Result<bool> {
        match fs::remove_file(path) {
            Ok(()) => Ok(true),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(err) => Err(Error::Io(err)),
        }
    }
}
