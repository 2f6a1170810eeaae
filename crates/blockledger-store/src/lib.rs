//! # blockledger store
//!
//! Storage abstraction for blockledger chains. Provides a trait-based
//! interface for block persistence with in-memory, filesystem and SQLite
//! implementations.
//!
//! ## Key Types
//!
//! - [`Storage`] - The async trait every backend implements
//! - [`BlockIterator`] - Forward-only cursor over one chain
//! - [`MemoryStorage`] - In-memory storage, the reference backend
//! - [`FileStorage`] - One JSON file per block, per-chain serialization
//! - [`SqliteStorage`] - Transactional storage in a single database file
//! - [`CreateResult`] - Result of creating a chain
//!
//! ## Usage
//!
//! ```rust,no_run
//! use blockledger_core::{Block, ChainName};
//! use blockledger_store::{SqliteStorage, Storage};
//!
//! async fn example() -> blockledger_store::Result<()> {
//!     let storage = SqliteStorage::open("blockchain.db")?;
//!     let chain = ChainName::new("ledger")?;
//!
//!     storage.create_chain(&chain).await?;
//!
//!     let mut block = Block::new("hello");
//!     storage.append_block(&chain, &mut block).await?;
//!     assert_eq!(block.index(), 1);
//!     Ok(())
//! }
//! ```
//!
//! ## Design Notes
//!
//! - **Genesis on create**: every chain starts with the same genesis block
//! - **Backend-side linking**: `append_block` assigns index and previous hash
//! - **Lenient iteration**: unreadable blocks end a cursor and are logged

pub mod cursor;
pub mod error;
pub mod fs;
pub mod memory;
pub mod migration;
pub mod record;
pub mod sqlite;
pub mod traits;

pub use cursor::BlockCursor;
pub use error::{Result, StoreError};
pub use fs::FileStorage;
pub use memory::MemoryStorage;
pub use record::BlockRecord;
pub use sqlite::SqliteStorage;
pub use traits::{BlockIterator, CreateResult, Storage};
