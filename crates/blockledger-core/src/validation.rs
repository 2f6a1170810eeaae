//! Link validation between consecutive blocks.

use thiserror::Error;

use crate::block::Block;

/// Why a block failed to follow its predecessor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum LinkError {
    /// The stored hash does not match the block's fields.
    #[error("stored hash does not match block contents")]
    HashMismatch,
    /// The previous hash does not point at the predecessor.
    #[error("previous hash does not point at the preceding block")]
    BrokenLink,
}

/// Check that `block` follows `previous`, reporting which rule failed.
///
/// Unlike [`Block::is_valid_with`] this does not compare identity; it is
/// meant for walking a chain where each block is read fresh from storage.
pub fn check_link(block: &Block, previous: &Block) -> Result<(), LinkError> {
    if !block.has_valid_hash() {
        return Err(LinkError::HashMismatch);
    }
    if !block.previous_hash().points_to(previous.hash()) {
        return Err(LinkError::BrokenLink);
    }
    Ok(())
}

/// [`Block::is_valid_with`] for optional arguments: false if either is absent.
pub fn is_block_valid_with(block: Option<&Block>, previous: Option<&Block>) -> bool {
    match (block, previous) {
        (Some(block), Some(previous)) => block.is_valid_with(previous),
        _ => false,
    }
}
