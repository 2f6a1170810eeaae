//! Golden test vectors for deterministic verification.
//!
//! These pin the block digest layout: any change to hashing, timestamp
//! rendering or the previous-hash markers breaks them, and with it every
//! chain already on disk.

use blockledger_core::{Block, BlockHash, PreviousHash, Timestamp};

/// How a vector's block is linked.
#[derive(Debug, Clone, Copy)]
pub enum VectorLink {
    /// Never appended.
    Unlinked,
    /// The genesis marker.
    Root,
    /// Hex of the predecessor's hash.
    Hash(&'static str),
}

/// A golden test vector.
#[derive(Debug, Clone)]
pub struct GoldenVector {
    /// Human-readable name for the vector.
    pub name: &'static str,
    pub data: &'static [u8],
    /// `YYYYMMDDHHmmss`.
    pub timestamp: &'static str,
    pub index: u64,
    pub link: VectorLink,
    /// Expected block hash (hex).
    pub expected_hash: &'static str,
}

/// Hex hash of the genesis block.
pub const GENESIS_HASH_HEX: &str =
    "81e0ffcfb6b4c2f6d1da843ef1c1c615266e6f92f7f482f1bce77e120a2ed4e9";

const HELLO_HASH_HEX: &str = "5e3551e73e2b726a508031db32b239b549862b3777d64b30b2e867465a00de53";
const WORLD_HASH_HEX: &str = "1af5c6b1e3718c6fb51abfc195ec778682f400d63354407bae2751e04491d4d5";

/// Get all golden test vectors.
///
/// The genesis, "hello" and "world" vectors form a valid three-block chain.
pub fn all_vectors() -> Vec<GoldenVector> {
    vec![
        GoldenVector {
            name: "genesis",
            data: b"TM",
            timestamp: "19790905230900",
            index: 0,
            link: VectorLink::Root,
            expected_hash: GENESIS_HASH_HEX,
        },
        GoldenVector {
            name: "hello after genesis",
            data: b"hello",
            timestamp: "20240102030405",
            index: 1,
            link: VectorLink::Hash(GENESIS_HASH_HEX),
            expected_hash: HELLO_HASH_HEX,
        },
        GoldenVector {
            name: "world after hello",
            data: b"world",
            timestamp: "20240102030406",
            index: 2,
            link: VectorLink::Hash(HELLO_HASH_HEX),
            expected_hash: WORLD_HASH_HEX,
        },
        GoldenVector {
            name: "empty unlinked block",
            data: b"",
            timestamp: "20240102030405",
            index: 0,
            link: VectorLink::Unlinked,
            expected_hash: "6ddb14335b5004d2f938183eb4599b61527f41a54e0f909ce438d8027dfc8f9f",
        },
    ]
}

/// Build the block a vector describes.
pub fn block_from_vector(vector: &GoldenVector) -> Block {
    let timestamp = Timestamp::parse(vector.timestamp).expect("vector timestamp is well-formed");
    let mut block = Block::with_timestamp(vector.data, timestamp);

    match vector.link {
        VectorLink::Unlinked => block.link(vector.index, PreviousHash::Unlinked),
        VectorLink::Root => block.link(vector.index, PreviousHash::Root),
        VectorLink::Hash(hex) => {
            let previous = BlockHash::from_hex(hex).expect("vector link is 32 bytes of hex");
            block.link(vector.index, previous);
        }
    }

    block
}

/// The genesis, "hello" and "world" blocks, in order.
pub fn golden_chain() -> Vec<Block> {
    all_vectors()
        .iter()
        .filter(|v| !matches!(v.link, VectorLink::Unlinked))
        .map(block_from_vector)
        .collect()
}

/// Check every vector, returning `(name, matches, actual_hex)`.
pub fn verify_all_vectors() -> Vec<(String, bool, String)> {
    all_vectors()
        .iter()
        .map(|v| {
            let hex = block_from_vector(v).hash().to_hex();
            let matches = hex == v.expected_hash;
            (v.name.to_string(), matches, hex)
        })
        .collect()
}
