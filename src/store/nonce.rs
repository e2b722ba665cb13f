//! Nonce Allocator
//!
//! Issues strictly increasing transaction sequence numbers per
//! (address, network), backed by a persisted counter. The counter is the
//! sole source of truth for "next nonce to use": allocation is a single
//! conditional upsert, so two concurrent callers can never receive the
//! same value, in this process or any other process sharing the store.

use crate::ReconcileOutcome;
use crate::store::StoreError;
use ethers::types::Address;
use sqlx::{Row, SqlitePool};
use tracing::{debug, info};

#[derive(Clone)]
pub struct NonceAllocator {
    pool: SqlitePool,
}

impl NonceAllocator {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Allocate the next unused nonce for (address, network).
    ///
    /// Inserts the key with counter 0 when absent, otherwise increments,
    /// as one indivisible statement. A store failure aborts the enclosing
    /// flow; there is no degraded path for nonce issuance.
    pub async fn allocate(&self, address: Address, network: &str) -> Result<u64, StoreError> {
        let row = sqlx::query(
            "INSERT INTO nonces (address, network, nonce) \
             VALUES (?1, ?2, 0) \
             ON CONFLICT (address, network) \
             DO UPDATE SET nonce = nonce + 1 \
             RETURNING nonce",
        )
        .bind(key(address))
        .bind(network)
        .fetch_one(&self.pool)
        .await?;

        let nonce = row.get::<i64, _>(0) as u64;
        debug!(network, nonce, "allocated nonce");
        Ok(nonce)
    }

    /// Last allocated value, or `None` if never allocated.
    pub async fn read(&self, address: Address, network: &str) -> Result<Option<u64>, StoreError> {
        let row = sqlx::query(
            "SELECT nonce FROM nonces \
             WHERE address = ?1 AND network = ?2",
        )
        .bind(key(address))
        .bind(network)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|r| r.get::<i64, _>(0) as u64))
    }

    /// Reconcile the stored counter against the chain-reported transaction
    /// count for this address.
    ///
    /// Rules:
    /// - chain count 0: fresh account on this network, reset to 0
    /// - stored >= chain count: a previously allocated nonce was never
    ///   mined; roll back to `chain count - 1` so the next allocation
    ///   reissues the stuck value
    /// - stored < chain count: leave unchanged
    ///
    /// Advisory repair, run out of band. It is not atomic with
    /// [`allocate`]: a repair racing a live allocation can act on a stale
    /// chain count. That race is accepted rather than papered over with
    /// unproven locking.
    pub async fn reconcile(
        &self,
        address: Address,
        network: &str,
        chain_count: u64,
    ) -> Result<ReconcileOutcome, StoreError> {
        let stored = match self.read(address, network).await? {
            Some(stored) => stored,
            None => return Ok(ReconcileOutcome::NeverAllocated),
        };

        let outcome = if chain_count == 0 {
            self.set(address, network, 0).await?;
            ReconcileOutcome::ResetToZero
        } else if stored >= chain_count {
            let to = chain_count - 1;
            self.set(address, network, to).await?;
            ReconcileOutcome::RolledBack { to }
        } else {
            ReconcileOutcome::Unchanged
        };

        info!(
            network,
            stored, chain_count, ?outcome, "nonce reconciliation"
        );
        Ok(outcome)
    }

    async fn set(&self, address: Address, network: &str, nonce: u64) -> Result<(), StoreError> {
        sqlx::query(
            "UPDATE nonces SET nonce = ?3 \
             WHERE address = ?1 AND network = ?2",
        )
        .bind(key(address))
        .bind(network)
        .bind(nonce as i64)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

/// Canonical store key for an address: full lowercase 0x-prefixed hex.
fn key(address: Address) -> String {
    format!("{address:?}")
}
