//! Database schema migrations for SQLite.
//!
//! Versioned and forward-only: each migration transforms the schema from
//! version N to N+1 inside the same transaction that records it.

use rusqlite::Connection;

use crate::error::{Result, StoreError};

/// Current schema version.
pub const CURRENT_VERSION: u32 = 1;

/// Initialize or migrate the database schema.
///
/// Idempotent: running it against an up-to-date database is a no-op.
pub fn migrate(conn: &mut Connection) -> Result<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS schema_migrations (
            version INTEGER PRIMARY KEY,
            applied_at INTEGER NOT NULL
        )",
        [],
    )?;

    let current: u32 = conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM schema_migrations",
        [],
        |row| row.get(0),
    )?;

    if current > CURRENT_VERSION {
        return Err(StoreError::Migration(format!(
            "database schema version {} is newer than supported version {}",
            current, CURRENT_VERSION
        )));
    }

    if current < CURRENT_VERSION {
        let tx = conn.transaction()?;

        for version in (current + 1)..=CURRENT_VERSION {
            apply_migration(&tx, version)?;

            tx.execute(
                "INSERT INTO schema_migrations (version, applied_at) VALUES (?1, ?2)",
                rusqlite::params![version, chrono::Utc::now().timestamp_millis()],
            )?;
        }

        tx.commit()?;
        tracing::info!(from = current, to = CURRENT_VERSION, "database schema migrated");
    }

    Ok(())
}

fn apply_migration(conn: &Connection, version: u32) -> Result<()> {
    match version {
        1 => apply_v1(conn),
        _ => Err(StoreError::Migration(format!(
            "unknown migration version: {}",
            version
        ))),
    }
}

/// Migration v1: chains and their blocks.
fn apply_v1(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        CREATE TABLE chains (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL UNIQUE,         -- normalized chain name
            created_at TEXT NOT NULL           -- RFC 3339
        );

        CREATE TABLE blocks (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            chain INTEGER NOT NULL REFERENCES chains(id) ON DELETE CASCADE,
            block_index INTEGER NOT NULL,      -- 0 is the genesis block
            data BLOB NOT NULL,
            hash BLOB NOT NULL,                -- 32 bytes, SHA-256
            previous_hash BLOB NOT NULL,       -- 32-byte hash or a 2-byte marker
            timestamp TEXT NOT NULL,           -- YYYYMMDDHHmmss, UTC

            UNIQUE(chain, block_index)
        );

        CREATE INDEX idx_blocks_chain ON blocks(chain);
        "#,
    )?;

    Ok(())
}
