//! The chain handle: appends, traversal and validation.

use std::fmt;
use std::sync::Arc;

use blockledger_core::{check_link, Block, ChainName};
use blockledger_store::{BlockIterator, Storage, StoreError};

/// A lightweight handle on one chain: its name plus the shared storage.
///
/// Cheap to clone and safe to rebuild per request; all state lives in
/// the storage.
#[derive(Clone)]
pub struct Chain {
    name: ChainName,
    storage: Arc<dyn Storage>,
}

/// Per-block context passed to the action of [`Chain::each`].
pub struct EachContext<'a> {
    block: &'a Block,
    index: u64,
    cancelled: bool,
}

impl<'a> EachContext<'a> {
    /// The block being visited.
    pub fn block(&self) -> &'a Block {
        self.block
    }

    /// Zero-based count of blocks visited so far in this traversal.
    ///
    /// Not the block's own index when the traversal started at an offset.
    pub fn index(&self) -> u64 {
        self.index
    }

    /// Stop the traversal after this block.
    pub fn cancel(&mut self) {
        self.cancelled = true;
    }

    /// Set or clear the cancellation flag.
    pub fn set_cancelled(&mut self, cancelled: bool) {
        self.cancelled = cancelled;
    }

    /// Whether the traversal will stop after this block.
    pub fn is_cancelled(&self) -> bool {
        self.cancelled
    }
}

/// Outcome of walking a chain and checking every link.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValidationReport {
    /// No broken block was found.
    pub valid: bool,
    /// Blocks that passed, including the first one.
    pub blocks_checked: u64,
    /// Index of the first block whose hash or link is wrong.
    pub broken_at: Option<u64>,
}

impl Chain {
    /// Bind a chain name to a storage.
    pub fn new(name: ChainName, storage: Arc<dyn Storage>) -> Self {
        Self { name, storage }
    }

    /// The normalized chain name.
    pub fn name(&self) -> &ChainName {
        &self.name
    }

    /// The storage this chain lives in.
    pub fn storage(&self) -> &Arc<dyn Storage> {
        &self.storage
    }

    /// Append `block` as the new tail.
    ///
    /// On success the block carries its assigned index, previous hash and
    /// recomputed hash.
    pub async fn try_add_block(&self, block: &mut Block) -> Result<(), StoreError> {
        self.storage.append_block(&self.name, block).await
    }

    /// Append `block` as the new tail, reporting only success.
    pub async fn add_block(&self, block: &mut Block) -> bool {
        match self.try_add_block(block).await {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(
                    backend = self.storage.kind(),
                    chain = %self.name,
                    error = %e,
                    "append failed"
                );
                false
            }
        }
    }

    /// A fresh cursor whose first `next()` returns the block at `offset`.
    pub fn get_iterator(&self, offset: u64) -> Box<dyn BlockIterator> {
        self.storage.get_iterator(&self.name, offset)
    }

    /// Visit blocks in order starting at `offset`.
    ///
    /// Returns true if the action cancelled the traversal.
    pub async fn each<F>(&self, offset: u64, mut action: F) -> bool
    where
        F: FnMut(&mut EachContext<'_>),
    {
        let mut iter = self.get_iterator(offset);
        let mut visited = 0u64;

        while let Some(block) = iter.next().await {
            let mut context = EachContext {
                block: &block,
                index: visited,
                cancelled: false,
            };
            action(&mut context);

            if context.cancelled {
                return true;
            }
            visited += 1;
        }

        false
    }

    /// Walk the whole chain and check every block against its predecessor.
    ///
    /// Stops at the first broken block. A block that cannot be read counts
    /// as broken. An empty or genesis-only chain is valid.
    pub async fn verify(&self) -> ValidationReport {
        let mut previous: Option<Block> = None;
        let mut blocks_checked = 0u64;
        let mut broken_at = None;

        self.each(0, |context| {
            let block = context.block();

            if let Some(previous) = &previous {
                if let Err(e) = check_link(block, previous) {
                    tracing::warn!(
                        chain = %self.name,
                        index = block.index(),
                        error = %e,
                        "chain validation failed"
                    );
                    broken_at = Some(block.index());
                    context.cancel();
                    return;
                }
            }

            blocks_checked += 1;
            previous = Some(block.clone());
        })
        .await;

        // Iteration also ends on a read error; tell that apart from the tail.
        if broken_at.is_none() {
            if let Err(e) = self.storage.block_at(&self.name, blocks_checked).await {
                tracing::warn!(
                    chain = %self.name,
                    index = blocks_checked,
                    error = %e,
                    "chain validation hit an unreadable block"
                );
                broken_at = Some(blocks_checked);
            }
        }

        ValidationReport {
            valid: broken_at.is_none(),
            blocks_checked,
            broken_at,
        }
    }

    /// Whether every block links correctly to its predecessor.
    pub async fn validate(&self) -> bool {
        self.verify().await.valid
    }

    /// The current tail, or `None` if it cannot be read.
    pub async fn latest_block(&self) -> Option<Block> {
        match self.storage.latest_block(&self.name).await {
            Ok(block) => block,
            Err(e) => {
                tracing::warn!(chain = %self.name, error = %e, "failed to read latest block");
                None
            }
        }
    }

    /// The block at `index`, or `None` if absent or unreadable.
    pub async fn block_at(&self, index: u64) -> Option<Block> {
        match self.storage.block_at(&self.name, index).await {
            Ok(block) => block,
            Err(e) => {
                tracing::warn!(chain = %self.name, index, error = %e, "failed to read block");
                None
            }
        }
    }
}

impl fmt::Debug for Chain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Chain")
            .field("name", &self.name)
            .field("backend", &self.storage.kind())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use blockledger_core::sha256;
    use blockledger_store::{BlockCursor, CreateResult, MemoryStorage};

    #[derive(Clone, Copy)]
    enum Tamper {
        Data,
        Hash,
        Unreadable,
    }

    /// Memory storage that corrupts one block on every read.
    #[derive(Clone)]
    struct TamperedStorage {
        inner: MemoryStorage,
        index: u64,
        tamper: Tamper,
    }

    impl TamperedStorage {
        fn corrupt(&self, block: Block) -> Block {
            if block.index() != self.index {
                return block;
            }
            match self.tamper {
                Tamper::Data => Block::from_parts(
                    "tampered",
                    *block.hash(),
                    block.index(),
                    *block.previous_hash(),
                    *block.timestamp(),
                ),
                Tamper::Hash => Block::from_parts(
                    block.data().clone(),
                    sha256(b"forged"),
                    block.index(),
                    *block.previous_hash(),
                    *block.timestamp(),
                ),
                Tamper::Unreadable => block,
            }
        }
    }

    #[async_trait]
    impl Storage for TamperedStorage {
        fn kind(&self) -> &'static str {
            "tampered"
        }

        async fn create_chain(&self, name: &ChainName) -> blockledger_store::Result<CreateResult> {
            self.inner.create_chain(name).await
        }

        async fn has_chain(&self, name: &ChainName) -> blockledger_store::Result<bool> {
            self.inner.has_chain(name).await
        }

        async fn append_block(&self, chain: &ChainName, block: &mut Block) -> blockledger_store::Result<()> {
            self.inner.append_block(chain, block).await
        }

        async fn latest_block(&self, chain: &ChainName) -> blockledger_store::Result<Option<Block>> {
            Ok(self.inner.latest_block(chain).await?.map(|b| self.corrupt(b)))
        }

        async fn block_at(&self, chain: &ChainName, index: u64) -> blockledger_store::Result<Option<Block>> {
            if index == self.index && matches!(self.tamper, Tamper::Unreadable) {
                return Err(StoreError::MalformedRecord(format!("block {} is unreadable", index)));
            }
            Ok(self.inner.block_at(chain, index).await?.map(|b| self.corrupt(b)))
        }

        fn get_iterator(&self, chain: &ChainName, offset: u64) -> Box<dyn BlockIterator> {
            Box::new(BlockCursor::new(self.clone(), chain.clone(), offset))
        }
    }

    async fn memory_chain(blocks: &[&'static str]) -> (MemoryStorage, Chain) {
        let storage = MemoryStorage::new();
        let name = ChainName::new("ledger").unwrap();
        storage.create_chain(&name).await.unwrap();

        let chain = Chain::new(name, Arc::new(storage.clone()));
        for data in blocks {
            assert!(chain.add_block(&mut Block::new(*data)).await);
        }
        (storage, chain)
    }

    async fn tampered_chain(blocks: &[&'static str], index: u64, tamper: Tamper) -> Chain {
        let (inner, chain) = memory_chain(blocks).await;
        let storage = TamperedStorage { inner, index, tamper };
        Chain::new(chain.name().clone(), Arc::new(storage))
    }

    #[tokio::test]
    async fn test_add_block_assigns_position() {
        let (_, chain) = memory_chain(&[]).await;

        let mut block = Block::new("hello");
        assert!(chain.add_block(&mut block).await);
        assert_eq!(block.index(), 1);
        assert!(block.previous_hash().points_to(Block::genesis().hash()));
        assert_eq!(chain.latest_block().await, Some(block));
    }

    #[tokio::test]
    async fn test_add_block_to_missing_chain() {
        let chain = Chain::new(
            ChainName::new("ghost").unwrap(),
            Arc::new(MemoryStorage::new()),
        );
        assert!(!chain.add_block(&mut Block::new("x")).await);
        assert!(matches!(
            chain.try_add_block(&mut Block::new("x")).await,
            Err(StoreError::ChainNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_each_visits_in_order() {
        let (_, chain) = memory_chain(&["a", "b", "c"]).await;

        let mut seen = Vec::new();
        let cancelled = chain
            .each(0, |context| seen.push((context.index(), context.block().index())))
            .await;

        assert!(!cancelled);
        assert_eq!(seen, vec![(0, 0), (1, 1), (2, 2), (3, 3)]);
    }

    #[tokio::test]
    async fn test_each_context_index_counts_from_offset() {
        let (_, chain) = memory_chain(&["a", "b", "c"]).await;

        let mut seen = Vec::new();
        chain
            .each(2, |context| seen.push((context.index(), context.block().index())))
            .await;

        assert_eq!(seen, vec![(0, 2), (1, 3)]);
    }

    #[tokio::test]
    async fn test_each_cancel_stops_traversal() {
        let (_, chain) = memory_chain(&["a", "b", "c"]).await;

        let mut visits = 0;
        let cancelled = chain
            .each(0, |context| {
                visits += 1;
                if context.index() == 1 {
                    context.cancel();
                }
            })
            .await;

        assert!(cancelled);
        assert_eq!(visits, 2);
    }

    #[tokio::test]
    async fn test_each_cancel_can_be_withdrawn() {
        let (_, chain) = memory_chain(&["a"]).await;

        let mut visits = 0;
        let cancelled = chain
            .each(0, |context| {
                visits += 1;
                context.cancel();
                context.set_cancelled(false);
            })
            .await;

        assert!(!cancelled);
        assert_eq!(visits, 2);
    }

    #[tokio::test]
    async fn test_each_past_tail_visits_nothing() {
        let (_, chain) = memory_chain(&["a", "b", "c"]).await;

        let mut visits = 0;
        assert!(!chain.each(5, |_| visits += 1).await);
        assert_eq!(visits, 0);
    }

    #[tokio::test]
    async fn test_genesis_only_chain_is_valid() {
        let (_, chain) = memory_chain(&[]).await;

        let report = chain.verify().await;
        assert!(report.valid);
        assert_eq!(report.blocks_checked, 1);
        assert_eq!(report.broken_at, None);
    }

    #[tokio::test]
    async fn test_intact_chain_is_valid() {
        let (_, chain) = memory_chain(&["hello", "world"]).await;
        assert!(chain.validate().await);
        assert_eq!(chain.verify().await.blocks_checked, 3);
    }

    #[tokio::test]
    async fn test_tampered_data_is_detected() {
        let chain = tampered_chain(&["hello", "world"], 1, Tamper::Data).await;

        let report = chain.verify().await;
        assert!(!report.valid);
        assert_eq!(report.broken_at, Some(1));
        assert_eq!(report.blocks_checked, 1);
        assert!(!chain.validate().await);
    }

    #[tokio::test]
    async fn test_tampered_hash_stops_traversal() {
        let chain = tampered_chain(&["a", "b", "c", "d"], 2, Tamper::Hash).await;

        let report = chain.verify().await;
        assert!(!report.valid);
        assert_eq!(report.broken_at, Some(2));
        assert_eq!(report.blocks_checked, 2);
    }

    #[tokio::test]
    async fn test_unreadable_block_fails_validation() {
        let chain = tampered_chain(&["a", "b", "c"], 2, Tamper::Unreadable).await;

        let report = chain.verify().await;
        assert!(!report.valid);
        assert_eq!(report.broken_at, Some(2));
        assert_eq!(report.blocks_checked, 2);
    }

    #[tokio::test]
    async fn test_reads_through_handle() {
        let (_, chain) = memory_chain(&["a"]).await;

        assert_eq!(chain.block_at(0).await, Some(Block::genesis()));
        assert_eq!(chain.block_at(9).await, None);

        let copy = chain.clone();
        assert_eq!(copy.latest_block().await, chain.latest_block().await);
        assert!(format!("{:?}", chain).contains("memory"));
    }
}
