//! Persisted Store Module
//!
//! The store owns the two tables that outlive the process: `nonces`, the
//! per-(address, network) transaction sequence counters, and `tx`, the
//! ledger of broadcast transactions and their receipts. Every component
//! treats the store as the single writer of truth; connections are scoped
//! per query via the pool and never held across an RPC round trip.

mod ledger;
mod nonce;

pub use ledger::{PendingTx, TransactionLedger};
pub use nonce::NonceAllocator;

use sqlx::SqlitePool;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store error: {0}")]
    Db(#[from] sqlx::Error),

    #[error("record not found: {0}")]
    RecordNotFound(String),

    #[error("record already exists: {0}")]
    Duplicate(String),

    #[error("encoding error: {0}")]
    Encoding(String),
}

/// Create the tables when they are missing. Run once at startup.
pub async fn init_schema(pool: &SqlitePool) -> Result<(), StoreError> {
    sqlx::query(
        "CREATE TABLE IF NOT EXISTS nonces ( \
             address TEXT NOT NULL, \
             network TEXT NOT NULL, \
             nonce   INTEGER NOT NULL, \
             PRIMARY KEY (address, network) \
         )",
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE TABLE IF NOT EXISTS tx ( \
             tx_hash    TEXT PRIMARY KEY, \
             network    TEXT NOT NULL, \
             tx_params  TEXT NOT NULL, \
             tx_receipt TEXT, \
             created    INTEGER NOT NULL, \
             updated    INTEGER \
         )",
    )
    .execute(pool)
    .await?;

    Ok(())
}

#[cfg(test)]
pub(crate) async fn test_pool() -> SqlitePool {
    use sqlx::sqlite::SqlitePoolOptions;

    // A single connection keeps the in-memory database alive and shared
    // across every query issued by a test.
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .expect("in-memory sqlite");
    init_schema(&pool).await.expect("schema");
    pool
}
