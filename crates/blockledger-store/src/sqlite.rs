//! SQLite implementation of the Storage trait.
//!
//! Uses rusqlite with bundled SQLite, wrapped in async via
//! `tokio::task::spawn_blocking`. Create and append run inside IMMEDIATE
//! transactions, so the write lock is taken before the tail is read and two
//! processes sharing the file cannot interleave an append.

use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use rusqlite::{params, Connection, ErrorCode, OptionalExtension, TransactionBehavior};

use blockledger_core::{Block, BlockHash, ChainName, PreviousHash, Timestamp};

use crate::cursor::BlockCursor;
use crate::error::{Result, StoreError};
use crate::migration;
use crate::traits::{BlockIterator, CreateResult, Storage};

/// How long a writer waits for another process's lock before failing.
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

const BLOCK_COLUMNS: &str = "b.block_index, b.data, b.hash, b.previous_hash, b.timestamp";

/// SQLite-based storage.
///
/// Thread-safe via an internal mutex; clones share the connection.
#[derive(Clone)]
pub struct SqliteStorage {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteStorage {
    /// Open a SQLite database at the given path.
    ///
    /// Creates the file and runs migrations if needed.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let conn = Connection::open(path)?;
        let storage = Self::init(conn)?;
        tracing::info!(backend = "sqlite", path = %path.display(), "database storage opened");
        Ok(storage)
    }

    /// Open an in-memory SQLite database.
    pub fn open_memory() -> Result<Self> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(mut conn: Connection) -> Result<Self> {
        conn.busy_timeout(BUSY_TIMEOUT)?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        migration::migrate(&mut conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Run a closure against the connection on the blocking pool.
    async fn run<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut Connection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let conn = self.conn.clone();

        tokio::task::spawn_blocking(move || {
            let mut conn = conn.lock().map_err(|e| {
                StoreError::Database(rusqlite::Error::SqliteFailure(
                    rusqlite::ffi::Error::new(rusqlite::ffi::SQLITE_LOCKED),
                    Some(format!("mutex poisoned: {}", e)),
                ))
            })?;
            f(&mut conn)
        })
        .await
        .map_err(|e| StoreError::Task(format!("spawn_blocking failed: {}", e)))?
    }
}

/// Raw column values of one `blocks` row.
struct BlockRow {
    index: i64,
    data: Vec<u8>,
    hash: Vec<u8>,
    previous_hash: Vec<u8>,
    timestamp: String,
}

impl BlockRow {
    fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            index: row.get(0)?,
            data: row.get(1)?,
            hash: row.get(2)?,
            previous_hash: row.get(3)?,
            timestamp: row.get(4)?,
        })
    }

    /// Validate column contents and rebuild the block.
    fn into_block(self) -> Result<Block> {
        let index = u64::try_from(self.index)
            .map_err(|_| StoreError::MalformedRecord(format!("negative block index {}", self.index)))?;
        let hash = BlockHash::try_from(self.hash.as_slice())?;
        let previous_hash = PreviousHash::from_bytes(&self.previous_hash)?;
        let timestamp = Timestamp::parse(self.timestamp.trim())?;

        Ok(Block::from_parts(
            Bytes::from(self.data),
            hash,
            index,
            previous_hash,
            timestamp,
        ))
    }
}

fn chain_id(conn: &Connection, name: &str) -> rusqlite::Result<Option<i64>> {
    conn.query_row("SELECT id FROM chains WHERE name = ?1", params![name], |row| row.get(0))
        .optional()
}

fn latest_row(conn: &Connection, name: &str) -> rusqlite::Result<Option<BlockRow>> {
    conn.query_row(
        &format!(
            "SELECT {} FROM blocks b JOIN chains c ON c.id = b.chain
             WHERE c.name = ?1 ORDER BY b.block_index DESC LIMIT 1",
            BLOCK_COLUMNS
        ),
        params![name],
        BlockRow::from_row,
    )
    .optional()
}

fn insert_block(conn: &Connection, chain: i64, block: &Block) -> Result<()> {
    let index = i64::try_from(block.index())
        .map_err(|_| StoreError::MalformedRecord(format!("block index {} out of range", block.index())))?;

    conn.execute(
        "INSERT INTO blocks (chain, block_index, data, hash, previous_hash, timestamp)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            chain,
            index,
            &block.data()[..],
            block.hash().as_bytes().as_slice(),
            block.previous_hash().as_bytes(),
            block.timestamp().to_string(),
        ],
    )?;

    Ok(())
}

fn is_unique_violation(err: &StoreError) -> bool {
    matches!(
        err,
        StoreError::Database(rusqlite::Error::SqliteFailure(e, _))
            if e.code == ErrorCode::ConstraintViolation
    )
}

#[async_trait]
impl Storage for SqliteStorage {
    fn kind(&self) -> &'static str {
        "sqlite"
    }

    async fn create_chain(&self, name: &ChainName) -> Result<CreateResult> {
        let key = name.as_str().to_owned();

        let result = self
            .run(move |conn| {
                let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

                if chain_id(&tx, &key)?.is_some() {
                    return Ok(CreateResult::AlreadyExists);
                }

                tx.execute(
                    "INSERT INTO chains (name, created_at) VALUES (?1, ?2)",
                    params![key, Timestamp::now().to_rfc3339()],
                )?;
                let id = tx.last_insert_rowid();
                insert_block(&tx, id, &Block::genesis())?;

                tx.commit()?;
                Ok(CreateResult::Created)
            })
            .await;

        match result {
            Ok(CreateResult::Created) => {
                tracing::debug!(backend = "sqlite", chain = %name, "chain created");
                Ok(CreateResult::Created)
            }
            Err(e) if is_unique_violation(&e) => Ok(CreateResult::AlreadyExists),
            other => other,
        }
    }

    async fn has_chain(&self, name: &ChainName) -> Result<bool> {
        let key = name.as_str().to_owned();
        self.run(move |conn| {
            let exists: bool = conn.query_row(
                "SELECT EXISTS(SELECT 1 FROM chains WHERE name = ?1)",
                params![key],
                |row| row.get(0),
            )?;
            Ok(exists)
        })
        .await
    }

    async fn append_block(&self, chain: &ChainName, block: &mut Block) -> Result<()> {
        let key = chain.as_str().to_owned();
        let pending = block.clone();

        let stored = self
            .run(move |conn| {
                let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

                let id = chain_id(&tx, &key)?.ok_or_else(|| StoreError::ChainNotFound(key.clone()))?;
                let latest = latest_row(&tx, &key)?
                    .ok_or_else(|| StoreError::MalformedRecord(format!("chain {} has no genesis", key)))?
                    .into_block()?;

                let mut block = pending;
                block.link(latest.index() + 1, *latest.hash());

                if let Err(e) = insert_block(&tx, id, &block) {
                    if is_unique_violation(&e) {
                        return Err(StoreError::Conflict {
                            chain: key,
                            index: block.index(),
                        });
                    }
                    return Err(e);
                }

                tx.commit()?;
                Ok(block)
            })
            .await?;

        tracing::debug!(backend = "sqlite", chain = %chain, index = stored.index(), "block appended");
        *block = stored;
        Ok(())
    }

    async fn latest_block(&self, chain: &ChainName) -> Result<Option<Block>> {
        let key = chain.as_str().to_owned();
        self.run(move |conn| latest_row(conn, &key)?.map(BlockRow::into_block).transpose())
            .await
    }

    async fn block_at(&self, chain: &ChainName, index: u64) -> Result<Option<Block>> {
        let Ok(position) = i64::try_from(index) else {
            return Ok(None);
        };
        let key = chain.as_str().to_owned();

        self.run(move |conn| {
            conn.query_row(
                &format!(
                    "SELECT {} FROM blocks b JOIN chains c ON c.id = b.chain
                     WHERE c.name = ?1 AND b.block_index = ?2",
                    BLOCK_COLUMNS
                ),
                params![key, position],
                BlockRow::from_row,
            )
            .optional()?
            .map(BlockRow::into_block)
            .transpose()
        })
        .await
    }

    fn get_iterator(&self, chain: &ChainName, offset: u64) -> Box<dyn BlockIterator> {
        Box::new(BlockCursor::new(self.clone(), chain.clone(), offset))
    }
}
