//! Storage trait: the abstract interface for chain persistence.
//!
//! This trait allows chains to be backend-agnostic. Implementations include
//! in-memory (reference and tests), filesystem (JSON file per block) and
//! SQLite (transactional).

use async_trait::async_trait;
use blockledger_core::{Block, ChainName};

use crate::error::Result;

/// Result of creating a chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CreateResult {
    /// The chain and its genesis block were created.
    Created,
    /// A chain with that name already exists (not an error).
    AlreadyExists,
}

/// The Storage trait: async interface for chain persistence.
///
/// All methods are async so that disk and database backends can suspend on
/// I/O. Instances are long-lived and shared by every concurrent caller.
///
/// # Invariants
///
/// - **Exactly-once genesis**: `create_chain` writes the genesis block
///   together with the chain, or neither.
/// - **Serialized appends**: within one chain, "read tail, compute next
///   index, write" never interleaves with another append. Indices are
///   strictly increasing with no gaps or duplicates.
/// - **No torn reads**: a reader never observes a partially written block.
#[async_trait]
pub trait Storage: Send + Sync {
    /// Short backend label used in logs.
    fn kind(&self) -> &'static str;

    /// Create a chain together with its genesis block.
    ///
    /// # Returns
    /// - `Created` if the chain is new.
    /// - `AlreadyExists` if a chain with that name exists.
    async fn create_chain(&self, name: &ChainName) -> Result<CreateResult>;

    /// Check whether a chain exists.
    async fn has_chain(&self, name: &ChainName) -> Result<bool>;

    /// Append a block as the new tail of `chain`.
    ///
    /// Overwrites the block's index and previous hash with the tail's
    /// successor position and hash, recomputes its hash, and persists it.
    /// On success `block` holds exactly what was stored.
    async fn append_block(&self, chain: &ChainName, block: &mut Block) -> Result<()>;

    /// Get the block with the highest index.
    async fn latest_block(&self, chain: &ChainName) -> Result<Option<Block>>;

    /// Get the block at a zero-based index.
    async fn block_at(&self, chain: &ChainName, index: u64) -> Result<Option<Block>>;

    /// Get a fresh, independent cursor starting at `offset`.
    fn get_iterator(&self, chain: &ChainName, offset: u64) -> Box<dyn BlockIterator>;
}

/// A forward-only, non-restartable traversal over a chain's blocks.
#[async_trait]
pub trait BlockIterator: Send {
    /// Return the next block, or `None` at the end of the sequence.
    ///
    /// Once `None` has been returned every further call returns `None`.
    async fn next(&mut self) -> Option<Block>;

    /// The value last returned by [`BlockIterator::next`], if any.
    fn current(&self) -> Option<&Block>;
}
