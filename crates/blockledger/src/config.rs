//! Startup configuration: which storage backend to open, and where.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;

use blockledger_store::{FileStorage, MemoryStorage, SqliteStorage, Storage};

use crate::error::{LedgerError, Result};

/// Environment variable selecting the backend.
pub const ENV_STORAGE: &str = "BLOCKCHAIN_STORAGE";

/// Environment variable holding the filesystem root or database file.
pub const ENV_PATH: &str = "BLOCKCHAIN_PATH";

/// Database file used when no path is configured.
pub const DEFAULT_DATABASE_FILE: &str = "blockchain.db";

/// The storage backend kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StorageKind {
    /// Process-lifetime, in-memory chains.
    #[default]
    Memory,
    /// One JSON file per block under a root directory.
    Filesystem,
    /// A single SQLite database file.
    Database,
}

impl StorageKind {
    /// Canonical lower-case name.
    pub fn as_str(&self) -> &'static str {
        match self {
            StorageKind::Memory => "memory",
            StorageKind::Filesystem => "filesystem",
            StorageKind::Database => "database",
        }
    }
}

impl fmt::Display for StorageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StorageKind {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "" | "mem" | "memory" => Ok(StorageKind::Memory),
            "file" | "files" | "filesystem" | "fs" | "json" => Ok(StorageKind::Filesystem),
            "db" | "database" | "sql" | "sqlite" => Ok(StorageKind::Database),
            other => Err(LedgerError::Config(format!("unsupported storage kind: {:?}", other))),
        }
    }
}

/// Configuration for opening a ledger.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LedgerConfig {
    /// Which backend to use.
    pub storage: StorageKind,
    /// Filesystem root (default: current directory) or database file
    /// (default: [`DEFAULT_DATABASE_FILE`]). Ignored for memory storage.
    pub path: Option<PathBuf>,
}

impl LedgerConfig {
    /// Configuration for the given backend with its default location.
    pub fn new(storage: StorageKind) -> Self {
        Self { storage, path: None }
    }

    /// Set the backend location.
    pub fn with_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.path = Some(path.into());
        self
    }

    /// Read [`ENV_STORAGE`] and [`ENV_PATH`] from the process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a configuration from any key/value source.
    ///
    /// Unset and empty values fall back to the defaults; an unknown
    /// storage kind is an error.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let storage = match lookup(ENV_STORAGE) {
            Some(value) => value.parse()?,
            None => StorageKind::default(),
        };

        let path = lookup(ENV_PATH)
            .map(|value| value.trim().to_owned())
            .filter(|value| !value.is_empty())
            .map(PathBuf::from);

        Ok(Self { storage, path })
    }

    /// Open the configured backend.
    pub fn open_storage(&self) -> Result<Arc<dyn Storage>> {
        let storage: Arc<dyn Storage> = match self.storage {
            StorageKind::Memory => Arc::new(MemoryStorage::new()),
            StorageKind::Filesystem => {
                let root = self.path.clone().unwrap_or_default();
                Arc::new(FileStorage::open(root)?)
            }
            StorageKind::Database => {
                let file = self
                    .path
                    .clone()
                    .unwrap_or_else(|| PathBuf::from(DEFAULT_DATABASE_FILE));
                Arc::new(SqliteStorage::open(file)?)
            }
        };

        tracing::info!(storage = %self.storage, backend = storage.kind(), "storage ready");
        Ok(storage)
    }
}
