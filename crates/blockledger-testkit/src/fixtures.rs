//! Test fixtures and helpers.
//!
//! One fixture per storage backend, each with its own scratch directory,
//! so the same scenario can run against every backend.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tempfile::TempDir;

use blockledger_core::{Block, ChainName, Timestamp};
use blockledger_store::{FileStorage, MemoryStorage, SqliteStorage, Storage};

/// The backends a fixture can stand up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendKind {
    Memory,
    Filesystem,
    Sqlite,
}

/// Every backend, in a stable order.
pub const ALL_BACKENDS: [BackendKind; 3] =
    [BackendKind::Memory, BackendKind::Filesystem, BackendKind::Sqlite];

/// A storage backend plus whatever scratch space it needs.
///
/// The scratch directory is deleted when the fixture is dropped.
pub struct StorageFixture {
    pub kind: BackendKind,
    pub storage: Arc<dyn Storage>,
    location: Option<PathBuf>,
    _dir: Option<TempDir>,
}

impl StorageFixture {
    /// Stand up a fresh, empty backend.
    pub fn new(kind: BackendKind) -> Self {
        match kind {
            BackendKind::Memory => Self {
                kind,
                storage: Arc::new(MemoryStorage::new()),
                location: None,
                _dir: None,
            },
            BackendKind::Filesystem => {
                let dir = TempDir::new().expect("create scratch directory");
                let root = dir.path().join("chains");
                let storage = FileStorage::open(&root).expect("open file storage");
                Self {
                    kind,
                    storage: Arc::new(storage),
                    location: Some(root),
                    _dir: Some(dir),
                }
            }
            BackendKind::Sqlite => {
                let dir = TempDir::new().expect("create scratch directory");
                let file = dir.path().join("blockchain.db");
                let storage = SqliteStorage::open(&file).expect("open database storage");
                Self {
                    kind,
                    storage: Arc::new(storage),
                    location: Some(file),
                    _dir: Some(dir),
                }
            }
        }
    }

    pub fn memory() -> Self {
        Self::new(BackendKind::Memory)
    }

    pub fn filesystem() -> Self {
        Self::new(BackendKind::Filesystem)
    }

    pub fn sqlite() -> Self {
        Self::new(BackendKind::Sqlite)
    }

    /// One fresh fixture per backend.
    pub fn all() -> Vec<Self> {
        ALL_BACKENDS.iter().copied().map(Self::new).collect()
    }

    /// Filesystem root or database file; `None` for memory.
    pub fn location(&self) -> Option<&Path> {
        self.location.as_deref()
    }

    /// Whether data survives reopening the backend.
    pub fn is_persistent(&self) -> bool {
        self.kind != BackendKind::Memory
    }

    /// A second, independent instance over the same data.
    ///
    /// For memory storage this is the same instance.
    pub fn reopen(&self) -> Arc<dyn Storage> {
        match (self.kind, self.location()) {
            (BackendKind::Filesystem, Some(root)) => {
                Arc::new(FileStorage::open(root).expect("reopen file storage"))
            }
            (BackendKind::Sqlite, Some(file)) => {
                Arc::new(SqliteStorage::open(file).expect("reopen database storage"))
            }
            _ => self.storage.clone(),
        }
    }
}

impl fmt::Debug for StorageFixture {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StorageFixture")
            .field("kind", &self.kind)
            .field("location", &self.location)
            .finish()
    }
}

/// Normalize a chain name, panicking on an empty one.
pub fn chain_name(raw: &str) -> ChainName {
    ChainName::new(raw).expect("test chain name is non-empty")
}

/// A block with a fixed `YYYYMMDDHHmmss` timestamp.
pub fn block_at_time(data: &'static str, timestamp: &str) -> Block {
    Block::with_timestamp(data, Timestamp::parse(timestamp).expect("test timestamp is well-formed"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use blockledger_store::CreateResult;

    #[tokio::test]
    async fn test_every_fixture_creates_genesis() {
        for fixture in StorageFixture::all() {
            let chain = chain_name("fixture");
            assert_eq!(
                fixture.storage.create_chain(&chain).await.unwrap(),
                CreateResult::Created,
                "{:?}",
                fixture.kind
            );
            assert_eq!(
                fixture.storage.latest_block(&chain).await.unwrap(),
                Some(Block::genesis())
            );
        }
    }

    #[tokio::test]
    async fn test_reopen_sees_same_data() {
        for fixture in StorageFixture::all() {
            let chain = chain_name("persisted");
            fixture.storage.create_chain(&chain).await.unwrap();

            let reopened = fixture.reopen();
            assert!(reopened.has_chain(&chain).await.unwrap(), "{:?}", fixture.kind);
        }
    }

    #[test]
    fn test_locations() {
        assert!(StorageFixture::memory().location().is_none());
        assert!(StorageFixture::filesystem().location().unwrap().is_dir());
        assert!(StorageFixture::sqlite().location().unwrap().is_file());
    }
}
