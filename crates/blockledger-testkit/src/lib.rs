//! # Blockledger Testkit
//!
//! Testing utilities for blockledger.
//!
//! ## Overview
//!
//! This crate provides:
//!
//! - **Golden vectors**: Fixed blocks with known hashes, pinning the digest layout
//! - **Generators**: Proptest strategies for property-based testing
//! - **Fixtures**: One scratch instance per storage backend
//!
//! ## Golden Vectors
//!
//! ```rust
//! use blockledger_testkit::vectors::{all_vectors, block_from_vector};
//!
//! for vector in all_vectors() {
//!     let block = block_from_vector(&vector);
//!     assert_eq!(block.hash().to_hex(), vector.expected_hash);
//! }
//! ```
//!
//! ## Property Testing
//!
//! ```rust,ignore
//! use proptest::prelude::*;
//! use blockledger_testkit::generators::{block_from_params, BlockParams};
//!
//! proptest! {
//!     #[test]
//!     fn block_hash_is_deterministic(params: BlockParams) {
//!         let b1 = block_from_params(&params);
//!         let b2 = block_from_params(&params);
//!         prop_assert_eq!(b1.hash(), b2.hash());
//!     }
//! }
//! ```
//!
//! ## Storage Fixtures
//!
//! ```rust
//! use blockledger_testkit::fixtures::StorageFixture;
//!
//! for fixture in StorageFixture::all() {
//!     println!("{:?}: {}", fixture.kind, fixture.storage.kind());
//! }
//! ```

pub mod fixtures;
pub mod generators;
pub mod vectors;

pub use fixtures::{block_at_time, chain_name, BackendKind, StorageFixture, ALL_BACKENDS};
pub use generators::{block_from_params, BlockParams};
pub use vectors::{all_vectors, block_from_vector, golden_chain, verify_all_vectors, GoldenVector};
