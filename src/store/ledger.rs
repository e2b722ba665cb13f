//! Transaction Ledger
//!
//! Persisted record of every transaction this service has broadcast. A
//! record is created at broadcast time with no receipt; observing a
//! receipt later is terminal for the record. Records whose receipt is
//! still absent are the input to the pending-transaction reconciler.

use crate::TxParams;
use crate::store::StoreError;
use chrono::Utc;
use ethers::types::{H256, TransactionReceipt};
use sqlx::{Row, SqlitePool};
use tracing::debug;

/// A broadcast transaction still awaiting its receipt.
#[derive(Debug, Clone)]
pub struct PendingTx {
    pub tx_hash: H256,
    pub created: i64,
}

#[derive(Clone)]
pub struct TransactionLedger {
    pool: SqlitePool,
}

impl TransactionLedger {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Insert a new record with an absent receipt. A duplicate hash is an
    /// error: one broadcast, one record.
    pub async fn store(
        &self,
        tx_hash: H256,
        network: &str,
        params: &TxParams,
    ) -> Result<(), StoreError> {
        let params_json =
            serde_json::to_string(params).map_err(|e| StoreError::Encoding(e.to_string()))?;

        let result = sqlx::query(
            "INSERT INTO tx (tx_hash, network, tx_params, created) \
             VALUES (?1, ?2, ?3, ?4)",
        )
        .bind(hash_key(tx_hash))
        .bind(network)
        .bind(params_json)
        .bind(Utc::now().timestamp())
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => {
                debug!(network, tx_hash = %hash_key(tx_hash), "ledger record created");
                Ok(())
            }
            Err(sqlx::Error::Database(e)) if e.is_unique_violation() => {
                Err(StoreError::Duplicate(hash_key(tx_hash)))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Set the receipt on an existing record and refresh its update
    /// timestamp. Unknown hashes are an error; re-setting the same
    /// receipt is harmless.
    pub async fn update(
        &self,
        tx_hash: H256,
        receipt: &TransactionReceipt,
    ) -> Result<(), StoreError> {
        let receipt_json = serde_json::to_string(receipt)
            .map_err(|e| StoreError::Encoding(e.to_string()))?;

        let result = sqlx::query(
            "UPDATE tx SET tx_receipt = ?2, updated = ?3 \
             WHERE tx_hash = ?1",
        )
        .bind(hash_key(tx_hash))
        .bind(receipt_json)
        .bind(Utc::now().timestamp())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::RecordNotFound(hash_key(tx_hash)));
        }
        Ok(())
    }

    /// All receipt-less records for `network` created within the last
    /// `max_age_secs`. A finite snapshot; rows added after the query
    /// starts are picked up by a future sweep.
    pub async fn list_pending(
        &self,
        network: &str,
        max_age_secs: u64,
    ) -> Result<Vec<PendingTx>, StoreError> {
        let cutoff = Utc::now().timestamp() - max_age_secs as i64;

        let rows = sqlx::query(
            "SELECT tx_hash, created FROM tx \
             WHERE tx_receipt IS NULL \
               AND network = ?1 \
               AND created > ?2",
        )
        .bind(network)
        .bind(cutoff)
        .fetch_all(&self.pool)
        .await?;

        let mut pending = Vec::with_capacity(rows.len());
        for row in rows {
            let raw: String = row.get(0);
            let tx_hash = raw
                .trim_start_matches("0x")
                .parse::<H256>()
                .map_err(|e| StoreError::Encoding(format!("bad hash {raw}: {e}")))?;
            pending.push(PendingTx {
                tx_hash,
                created: row.get::<i64, _>(1),
            });
        }
        Ok(pending)
    }
}

/// Canonical store key for a transaction hash: full lowercase 0x-prefixed
/// hex.
fn hash_key(tx_hash: H256) -> String {
    format!("{tx_hash:?}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::test_pool;
    use ethers::types::U256;

    fn params() -> TxParams {
        TxParams {
            to: Some("0x2222222222222222222222222222222222222222".parse().unwrap()),
            value: U256::from(315_000),
            gas_price: U256::from(20_000_000_000u64),
            gas_limit: U256::from(21_000),
            nonce: U256::zero(),
            data: Default::default(),
        }
    }

    fn receipt(tx_hash: H256) -> TransactionReceipt {
        TransactionReceipt {
            transaction_hash: tx_hash,
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn stored_records_show_up_as_pending() {
        let ledger = TransactionLedger::new(test_pool().await);
        let hash = H256::repeat_byte(1);

        ledger.store(hash, "rinkeby", &params()).await.unwrap();

        let pending = ledger.list_pending("rinkeby", 3600).await.unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].tx_hash, hash);

        // Other networks see nothing
        assert!(ledger.list_pending("mainnet", 3600).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn duplicate_hashes_are_rejected() {
        let ledger = TransactionLedger::new(test_pool().await);
        let hash = H256::repeat_byte(2);

        ledger.store(hash, "rinkeby", &params()).await.unwrap();
        assert!(matches!(
            ledger.store(hash, "rinkeby", &params()).await,
            Err(StoreError::Duplicate(_))
        ));
    }

    #[tokio::test]
    async fn a_receipt_settles_the_record() {
        let ledger = TransactionLedger::new(test_pool().await);
        let hash = H256::repeat_byte(3);

        ledger.store(hash, "rinkeby", &params()).await.unwrap();
        ledger.update(hash, &receipt(hash)).await.unwrap();

        assert!(ledger.list_pending("rinkeby", 3600).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn receipt_updates_are_idempotent() {
        let ledger = TransactionLedger::new(test_pool().await);
        let hash = H256::repeat_byte(4);

        ledger.store(hash, "rinkeby", &params()).await.unwrap();
        ledger.update(hash, &receipt(hash)).await.unwrap();
        ledger.update(hash, &receipt(hash)).await.unwrap();

        assert!(ledger.list_pending("rinkeby", 3600).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn updating_an_unknown_hash_fails() {
        let ledger = TransactionLedger::new(test_pool().await);
        let hash = H256::repeat_byte(5);

        assert!(matches!(
            ledger.update(hash, &receipt(hash)).await,
            Err(StoreError::RecordNotFound(_))
        ));
    }

    #[tokio::test]
    async fn old_records_age_out_of_the_pending_window() {
        let ledger = TransactionLedger::new(test_pool().await);
        let hash = H256::repeat_byte(6);
        ledger.store(hash, "rinkeby", &params()).await.unwrap();

        // Zero lookback: the record was created "now", which is not
        // strictly newer than the cutoff
        assert!(ledger.list_pending("rinkeby", 0).await.unwrap().is_empty());
        assert_eq!(ledger.list_pending("rinkeby", 60).await.unwrap().len(), 1);
    }
}
