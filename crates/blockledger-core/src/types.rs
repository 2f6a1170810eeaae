//! Strong type definitions for block links.
//!
//! A block points at its predecessor through [`PreviousHash`], which is
//! either one of two fixed sentinels or a real [`BlockHash`].

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::CoreError;

/// Raw bytes of the placeholder link carried by a block before it is appended.
pub const UNLINKED_MARKER: &[u8; 2] = b"TM";

/// Raw bytes of the root link carried by every genesis block.
pub const ROOT_MARKER: &[u8; 2] = b"MK";

/// A 32-byte block hash, computed as SHA-256 over the block's ordered fields.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BlockHash(pub [u8; 32]);

impl BlockHash {
    /// Create a new BlockHash from raw bytes.
    pub const fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Get the raw bytes.
    pub const fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Convert to hex string.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Parse from hex string.
    pub fn from_hex(s: &str) -> Result<Self, hex::FromHexError> {
        let bytes = hex::decode(s)?;
        if bytes.len() != 32 {
            return Err(hex::FromHexError::InvalidStringLength);
        }
        let mut arr = [0u8; 32];
        arr.copy_from_slice(&bytes);
        Ok(Self(arr))
    }
}

impl fmt::Debug for BlockHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BlockHash({})", &self.to_hex()[..16])
    }
}

impl fmt::Display for BlockHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", &self.to_hex()[..16])
    }
}

impl AsRef<[u8]> for BlockHash {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl From<[u8; 32]> for BlockHash {
    fn from(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }
}

impl TryFrom<&[u8]> for BlockHash {
    type Error = CoreError;

    fn try_from(slice: &[u8]) -> Result<Self, Self::Error> {
        let arr: [u8; 32] = slice
            .try_into()
            .map_err(|_| CoreError::InvalidHashLength(slice.len()))?;
        Ok(Self(arr))
    }
}

/// The link from a block to its predecessor.
///
/// The two sentinels are two bytes long, so neither can collide with a
/// 32-byte digest.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub enum PreviousHash {
    /// Not yet appended; storage overwrites this on append.
    Unlinked,
    /// The fixed root of every chain, carried by the genesis block.
    Root,
    /// Hash of the preceding block.
    Block(BlockHash),
}

impl PreviousHash {
    /// The raw bytes fed into the digest and persisted by backends.
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            PreviousHash::Unlinked => UNLINKED_MARKER,
            PreviousHash::Root => ROOT_MARKER,
            PreviousHash::Block(hash) => hash.as_bytes(),
        }
    }

    /// Decode a persisted link.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, CoreError> {
        match bytes {
            b if b == UNLINKED_MARKER => Ok(PreviousHash::Unlinked),
            b if b == ROOT_MARKER => Ok(PreviousHash::Root),
            b if b.len() == 32 => Ok(PreviousHash::Block(BlockHash::try_from(b)?)),
            b => Err(CoreError::InvalidPreviousHash(b.len())),
        }
    }

    /// Whether this link points at `hash`.
    pub fn points_to(&self, hash: &BlockHash) -> bool {
        matches!(self, PreviousHash::Block(h) if h == hash)
    }
}

impl fmt::Debug for PreviousHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PreviousHash::Unlinked => write!(f, "Unlinked"),
            PreviousHash::Root => write!(f, "Root"),
            PreviousHash::Block(hash) => write!(f, "{:?}", hash),
        }
    }
}

impl From<BlockHash> for PreviousHash {
    fn from(hash: BlockHash) -> Self {
        PreviousHash::Block(hash)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_block_hash_hex_roundtrip() {
        let hash = BlockHash::from_bytes([0x42; 32]);
        let recovered = BlockHash::from_hex(&hash.to_hex()).unwrap();
        assert_eq!(hash, recovered);
    }

    #[test]
    fn test_block_hash_display() {
        let hash = BlockHash::from_bytes([0xab; 32]);
        assert_eq!(format!("{}", hash), "abababababababab");
    }

    #[test]
    fn test_block_hash_wrong_length() {
        let result = BlockHash::try_from(&[0u8; 31][..]);
        assert_eq!(result, Err(CoreError::InvalidHashLength(31)));
    }

    #[test]
    fn test_previous_hash_sentinels_decode() {
        assert_eq!(PreviousHash::from_bytes(b"TM").unwrap(), PreviousHash::Unlinked);
        assert_eq!(PreviousHash::from_bytes(b"MK").unwrap(), PreviousHash::Root);
        assert_eq!(PreviousHash::Root.as_bytes(), b"MK");
    }

    #[test]
    fn test_previous_hash_digest_decode() {
        let hash = BlockHash::from_bytes([0x11; 32]);
        let link = PreviousHash::from_bytes(hash.as_bytes()).unwrap();
        assert_eq!(link, PreviousHash::Block(hash));
        assert!(link.points_to(&hash));
        assert!(!PreviousHash::Root.points_to(&hash));
    }

    #[test]
    fn test_previous_hash_rejects_odd_lengths() {
        assert!(matches!(
            PreviousHash::from_bytes(b"XYZ"),
            Err(CoreError::InvalidPreviousHash(3))
        ));
        assert!(PreviousHash::from_bytes(b"").is_err());
    }
}
