//! The persisted block-file record used by the filesystem backend.
//!
//! ```json
//! {
//!   "data": "<base64>",
//!   "hash": "<base64, 32 bytes>",
//!   "index": 1,
//!   "previousHash": "<base64>",
//!   "timestamp": "YYYYMMDDHHmmss"
//! }
//! ```
//!
//! A record is only trusted after every field passes [`BlockRecord::into_block`].

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::{Deserialize, Serialize};

use blockledger_core::{Block, BlockHash, PreviousHash, Timestamp};

use crate::error::{Result, StoreError};

/// JSON shape of one block file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockRecord {
    pub data: String,
    pub hash: String,
    pub index: u64,
    pub previous_hash: String,
    pub timestamp: String,
}

impl BlockRecord {
    /// Encode a block for persistence.
    pub fn from_block(block: &Block) -> Self {
        Self {
            data: STANDARD.encode(block.data()),
            hash: STANDARD.encode(block.hash().as_bytes()),
            index: block.index(),
            previous_hash: STANDARD.encode(block.previous_hash().as_bytes()),
            timestamp: block.timestamp().to_string(),
        }
    }

    /// Parse and schema-check a record from file contents.
    pub fn parse(contents: &str) -> Result<Self> {
        Ok(serde_json::from_str(contents)?)
    }

    /// Render as pretty JSON with two-space indentation.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Validate every field and rebuild the block.
    ///
    /// The stored hash is kept as-is; callers detect tampering by
    /// recomputing it.
    pub fn into_block(self) -> Result<Block> {
        let data = decode_field("data", &self.data)?;

        let hash_bytes = decode_field("hash", &self.hash)?;
        let hash = BlockHash::try_from(hash_bytes.as_slice())?;

        let previous_bytes = decode_field("previousHash", &self.previous_hash)?;
        let previous_hash = PreviousHash::from_bytes(&previous_bytes)?;

        let timestamp = Timestamp::parse(self.timestamp.trim())?;

        Ok(Block::from_parts(data, hash, self.index, previous_hash, timestamp))
    }
}

fn decode_field(field: &str, value: &str) -> Result<Vec<u8>> {
    STANDARD
        .decode(value.trim())
        .map_err(|e| StoreError::MalformedRecord(format!("{} is not base64: {}", field, e)))
}
