//! In-memory implementation of the Storage trait.
//!
//! This is the reference backend and the default configuration. It has the
//! same semantics as the persistent backends but keeps everything in memory
//! for the lifetime of the process.

use std::collections::HashMap;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;

use blockledger_core::{Block, ChainName};

use crate::cursor::BlockCursor;
use crate::error::{Result, StoreError};
use crate::traits::{BlockIterator, CreateResult, Storage};

/// In-memory storage.
///
/// All data is lost when the last clone is dropped. Clones share state.
/// Every create and append is a single write-lock critical section.
#[derive(Clone, Default)]
pub struct MemoryStorage {
    inner: Arc<RwLock<MemoryStorageInner>>,
}

#[derive(Default)]
struct MemoryStorageInner {
    /// Block sequence per chain, position == block index.
    chains: HashMap<ChainName, Vec<Block>>,
}

impl MemoryStorage {
    /// Create a new empty in-memory storage.
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, MemoryStorageInner>> {
        self.inner.read().map_err(|_| StoreError::LockPoisoned)
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, MemoryStorageInner>> {
        self.inner.write().map_err(|_| StoreError::LockPoisoned)
    }
}

#[async_trait]
impl Storage for MemoryStorage {
    fn kind(&self) -> &'static str {
        "memory"
    }

    async fn create_chain(&self, name: &ChainName) -> Result<CreateResult> {
        let mut inner = self.write()?;

        if inner.chains.contains_key(name) {
            return Ok(CreateResult::AlreadyExists);
        }

        inner.chains.insert(name.clone(), vec![Block::genesis()]);
        tracing::debug!(backend = "memory", chain = %name, "chain created");

        Ok(CreateResult::Created)
    }

    async fn has_chain(&self, name: &ChainName) -> Result<bool> {
        Ok(self.read()?.chains.contains_key(name))
    }

    async fn append_block(&self, chain: &ChainName, block: &mut Block) -> Result<()> {
        let mut inner = self.write()?;

        let blocks = inner
            .chains
            .get_mut(chain)
            .ok_or_else(|| StoreError::ChainNotFound(chain.to_string()))?;

        let latest = blocks
            .last()
            .ok_or_else(|| StoreError::MalformedRecord(format!("chain {} has no genesis", chain)))?;

        block.link(latest.index() + 1, *latest.hash());
        blocks.push(block.clone());
        tracing::debug!(backend = "memory", chain = %chain, index = block.index(), "block appended");

        Ok(())
    }

    async fn latest_block(&self, chain: &ChainName) -> Result<Option<Block>> {
        let inner = self.read()?;
        Ok(inner.chains.get(chain).and_then(|blocks| blocks.last().cloned()))
    }

    async fn block_at(&self, chain: &ChainName, index: u64) -> Result<Option<Block>> {
        let inner = self.read()?;
        let Ok(position) = usize::try_from(index) else {
            return Ok(None);
        };
        Ok(inner
            .chains
            .get(chain)
            .and_then(|blocks| blocks.get(position).cloned()))
    }

    fn get_iterator(&self, chain: &ChainName, offset: u64) -> Box<dyn BlockIterator> {
        Box::new(BlockCursor::new(self.clone(), chain.clone(), offset))
    }
}
