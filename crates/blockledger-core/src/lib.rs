//! # Blockledger Core
//!
//! Pure primitives for blockledger: blocks, hash links, timestamps and chain
//! names.
//!
//! This crate contains no I/O, no storage, no concurrency. It is pure
//! computation over hash-linked records.
//!
//! ## Key Types
//!
//! - [`Block`] - One immutable, hash-linked record
//! - [`BlockHash`] - SHA-256 digest of a block's ordered fields
//! - [`PreviousHash`] - Link to the predecessor, or one of two sentinels
//! - [`Timestamp`] - Second-precision UTC time, `YYYYMMDDHHmmss` on the wire
//! - [`ChainName`] - Trimmed, case-folded chain identifier
//!
//! ## Hashing
//!
//! See [`crypto`] for the exact digest layout.

pub mod block;
pub mod crypto;
pub mod error;
pub mod name;
pub mod timestamp;
pub mod types;
pub mod validation;

pub use block::{Block, GENESIS_DATA, GENESIS_TIMESTAMP};
pub use crypto::{compute_block_hash, sha256};
pub use error::CoreError;
pub use name::ChainName;
pub use timestamp::{Timestamp, TIMESTAMP_FORMAT};
pub use types::{BlockHash, PreviousHash, ROOT_MARKER, UNLINKED_MARKER};
pub use validation::{check_link, is_block_valid_with, LinkError};
