//! # Blockledger
//!
//! Named, append-only chains of hash-linked blocks over pluggable storage.
//!
//! ## Overview
//!
//! - **Blocks**: opaque data plus a SHA-256 hash over index, previous hash,
//!   timestamp and data
//! - **Chains**: start with a fixed genesis block; every append links to the
//!   current tail
//! - **Storage**: in-memory, one JSON file per block, or SQLite, all behind
//!   the same trait
//! - **Validation**: a full walk that stops at the first broken link
//!
//! ## Usage
//!
//! ```rust,no_run
//! use blockledger::{Block, Ledger};
//! use blockledger::store::MemoryStorage;
//!
//! async fn example() {
//!     let ledger = Ledger::new(MemoryStorage::new());
//!
//!     let chain = ledger.create_chain("ledger").await.into_chain().unwrap();
//!
//!     let mut block = Block::new("hello");
//!     assert!(chain.add_block(&mut block).await);
//!     assert_eq!(block.index(), 1);
//!
//!     assert!(chain.validate().await);
//! }
//! ```
//!
//! Not-found and already-exists outcomes are variants of
//! [`CreateChainResult`] and [`GetChainResult`], never errors. Backend
//! failures are logged and reported the same way.
//!
//! ## Re-exports
//!
//! - `blockledger::core` - Blocks, hashes, timestamps, chain names
//! - `blockledger::store` - The storage trait and its backends

pub mod chain;
pub mod config;
pub mod error;
pub mod ledger;

pub use blockledger_core as core;
pub use blockledger_store as store;

pub use chain::{Chain, EachContext, ValidationReport};
pub use config::{LedgerConfig, StorageKind, DEFAULT_DATABASE_FILE, ENV_PATH, ENV_STORAGE};
pub use error::{LedgerError, Result};
pub use ledger::{CreateChainResult, GetChainResult, Ledger};

pub use blockledger_core::{Block, BlockHash, ChainName, PreviousHash, Timestamp};
pub use blockledger_store::{BlockIterator, Storage};
