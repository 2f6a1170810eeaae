//! Proptest generators for property-based testing.

use proptest::prelude::*;

use blockledger_core::{Block, BlockHash, ChainName, PreviousHash, Timestamp};

/// Generate payload bytes of specified max length.
pub fn payload(max_len: usize) -> impl Strategy<Value = Vec<u8>> {
    prop::collection::vec(any::<u8>(), 0..=max_len)
}

/// Generate a valid second-precision timestamp between years 1000 and 9999.
pub fn timestamp() -> impl Strategy<Value = Timestamp> {
    (1000u32..=9999, 1u32..=12, 1u32..=28, 0u32..24, 0u32..60, 0u32..60).prop_map(
        |(year, month, day, hour, minute, second)| {
            let wire = format!(
                "{:04}{:02}{:02}{:02}{:02}{:02}",
                year, month, day, hour, minute, second
            );
            Timestamp::parse(&wire).expect("generated timestamp is valid")
        },
    )
}

/// Generate a random BlockHash.
pub fn block_hash() -> impl Strategy<Value = BlockHash> {
    any::<[u8; 32]>().prop_map(BlockHash::from_bytes)
}

/// Generate any previous-hash shape.
pub fn previous_hash() -> impl Strategy<Value = PreviousHash> {
    prop_oneof![
        Just(PreviousHash::Unlinked),
        Just(PreviousHash::Root),
        block_hash().prop_map(PreviousHash::Block),
    ]
}

/// Generate a chain name that survives normalization unchanged.
pub fn chain_name() -> impl Strategy<Value = ChainName> {
    "[a-z][a-z0-9-]{0,31}".prop_map(|s| ChainName::new(&s).expect("generated name is non-empty"))
}

/// Parameters for generating a block.
#[derive(Debug, Clone)]
pub struct BlockParams {
    pub data: Vec<u8>,
    pub timestamp: Timestamp,
    pub index: u64,
    pub previous_hash: PreviousHash,
}

impl Arbitrary for BlockParams {
    type Parameters = ();
    type Strategy = BoxedStrategy<Self>;

    fn arbitrary_with(_: Self::Parameters) -> Self::Strategy {
        (payload(512), timestamp(), any::<u64>(), previous_hash())
            .prop_map(|(data, timestamp, index, previous_hash)| BlockParams {
                data,
                timestamp,
                index,
                previous_hash,
            })
            .boxed()
    }
}

/// Generate a block from parameters.
pub fn block_from_params(params: &BlockParams) -> Block {
    let mut block = Block::with_timestamp(params.data.clone(), params.timestamp);
    block.link(params.index, params.previous_hash);
    block
}
