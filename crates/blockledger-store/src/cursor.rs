//! The block cursor shared by every backend.
//!
//! Each `next()` reads exactly one block by `(chain, index)` through
//! [`Storage::block_at`]; the cursor keeps no state beyond its position.

use async_trait::async_trait;
use blockledger_core::{Block, ChainName};

use crate::traits::{BlockIterator, Storage};

/// A forward-only cursor over one chain.
///
/// Read failures end the sequence. They are logged with the chain and index
/// so that corruption is distinguishable from a short chain in the logs.
pub struct BlockCursor<S> {
    storage: S,
    chain: ChainName,
    next_index: u64,
    current: Option<Block>,
    exhausted: bool,
}

impl<S> BlockCursor<S> {
    /// Create a cursor whose first `next()` returns the block at `offset`.
    pub fn new(storage: S, chain: ChainName, offset: u64) -> Self {
        Self {
            storage,
            chain,
            next_index: offset,
            current: None,
            exhausted: false,
        }
    }
}

#[async_trait]
impl<S: Storage + 'static> BlockIterator for BlockCursor<S> {
    async fn next(&mut self) -> Option<Block> {
        if self.exhausted {
            return None;
        }

        let index = self.next_index;
        let block = match self.storage.block_at(&self.chain, index).await {
            Ok(block) => block,
            Err(e) => {
                tracing::warn!(
                    backend = self.storage.kind(),
                    chain = %self.chain,
                    index,
                    error = %e,
                    "unreadable block, ending iteration"
                );
                None
            }
        };

        match block {
            Some(_) => self.next_index = index.saturating_add(1),
            None => self.exhausted = true,
        }

        self.current = block.clone();
        block
    }

    fn current(&self) -> Option<&Block> {
        self.current.as_ref()
    }
}
