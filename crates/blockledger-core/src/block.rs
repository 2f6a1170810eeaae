//! Block: one immutable, hash-linked record in a chain's append log.
//!
//! A block is created once and never edited afterwards. The only mutation is
//! [`Block::link`], performed by a storage backend at append time, which
//! assigns the index and predecessor link and recomputes the hash.

use bytes::Bytes;

use crate::crypto::compute_block_hash;
use crate::timestamp::Timestamp;
use crate::types::{BlockHash, PreviousHash};

/// Payload of the genesis block.
pub const GENESIS_DATA: &[u8] = b"TM";

/// Timestamp of the genesis block (`YYYYMMDDHHmmss`, UTC).
pub const GENESIS_TIMESTAMP: &str = "19790905230900";

/// A block of a chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Block {
    data: Bytes,
    hash: BlockHash,
    index: u64,
    previous_hash: PreviousHash,
    timestamp: Timestamp,
}

impl Block {
    /// Create an unlinked block stamped with the current time.
    ///
    /// Index and previous hash are placeholders until the block is appended.
    pub fn new(data: impl Into<Bytes>) -> Self {
        Self::with_timestamp(data, Timestamp::now())
    }

    /// Create an unlinked block with a caller-supplied timestamp.
    pub fn with_timestamp(data: impl Into<Bytes>, timestamp: Timestamp) -> Self {
        let data = data.into();
        let previous_hash = PreviousHash::Unlinked;
        let hash = compute_block_hash(0, &previous_hash, &timestamp, &data);
        Self {
            data,
            hash,
            index: 0,
            previous_hash,
            timestamp,
        }
    }

    /// The fixed first block of every chain.
    ///
    /// Deterministic: every call returns an identical block.
    pub fn genesis() -> Self {
        let mut block = Self::with_timestamp(Bytes::from_static(GENESIS_DATA), Timestamp::genesis());
        block.link(0, PreviousHash::Root);
        block
    }

    /// Rebuild a block from persisted fields.
    ///
    /// The stored hash is kept as-is, not recomputed, so tampering stays
    /// detectable through [`Block::has_valid_hash`].
    pub fn from_parts(
        data: impl Into<Bytes>,
        hash: BlockHash,
        index: u64,
        previous_hash: PreviousHash,
        timestamp: Timestamp,
    ) -> Self {
        Self {
            data: data.into(),
            hash,
            index,
            previous_hash,
            timestamp,
        }
    }

    /// Assign the position of this block in a chain and recompute its hash.
    pub fn link(&mut self, index: u64, previous_hash: impl Into<PreviousHash>) {
        self.index = index;
        self.previous_hash = previous_hash.into();
        self.hash = self.compute_hash();
    }

    /// Recompute the hash from the current fields.
    pub fn compute_hash(&self) -> BlockHash {
        compute_block_hash(self.index, &self.previous_hash, &self.timestamp, &self.data)
    }

    /// Whether the stored hash matches the fields.
    pub fn has_valid_hash(&self) -> bool {
        self.compute_hash() == self.hash
    }

    /// Whether this block correctly follows `previous`.
    ///
    /// True iff the two are distinct objects, this block's hash is intact,
    /// and its link points at `previous`'s hash.
    pub fn is_valid_with(&self, previous: &Block) -> bool {
        !std::ptr::eq(self, previous)
            && self.has_valid_hash()
            && self.previous_hash.points_to(&previous.hash)
    }

    /// Whether this is the genesis block (index 0 with the root link).
    pub fn is_genesis(&self) -> bool {
        self.index == 0 && self.previous_hash == PreviousHash::Root
    }

    /// The payload.
    pub fn data(&self) -> &Bytes {
        &self.data
    }

    /// The stored hash.
    pub fn hash(&self) -> &BlockHash {
        &self.hash
    }

    /// Zero-based position in the chain.
    pub fn index(&self) -> u64 {
        self.index
    }

    /// Link to the predecessor.
    pub fn previous_hash(&self) -> &PreviousHash {
        &self.previous_hash
    }

    /// Creation time.
    pub fn timestamp(&self) -> &Timestamp {
        &self.timestamp
    }
}
