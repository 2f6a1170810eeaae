//! Block digest: SHA-256 over a block's ordered fields.
//!
//! The digest input is, in order:
//!
//! ```text
//! "{index}\n" || previous_hash_bytes || "\n" || "{timestamp}\n" || data
//! ```
//!
//! This layout matches the records already written by earlier deployments,
//! so stored hashes stay verifiable.

use sha2::{Digest, Sha256};

use crate::timestamp::Timestamp;
use crate::types::{BlockHash, PreviousHash};

/// Compute the hash of a block from its fields.
pub fn compute_block_hash(
    index: u64,
    previous_hash: &PreviousHash,
    timestamp: &Timestamp,
    data: &[u8],
) -> BlockHash {
    let mut hasher = Sha256::new();
    hasher.update(format!("{}\n", index).as_bytes());
    hasher.update(previous_hash.as_bytes());
    hasher.update(b"\n");
    hasher.update(format!("{}\n", timestamp).as_bytes());
    hasher.update(data);
    BlockHash(hasher.finalize().into())
}

/// Plain SHA-256 of arbitrary bytes.
pub fn sha256(data: &[u8]) -> BlockHash {
    BlockHash(Sha256::digest(data).into())
}
