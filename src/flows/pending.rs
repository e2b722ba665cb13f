use crate::FlowError;
use crate::chain::ChainRpc;
use crate::store::{PendingTx, TransactionLedger};
use futures::future::join_all;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Sweeps receipt-less ledger records for one network, fetching receipts
/// concurrently and settling whichever records the chain has mined.
pub struct PendingReconciler<C> {
    chain: Arc<C>,
    ledger: TransactionLedger,
}

/// What one sweep did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SweepReport {
    pub checked: usize,
    pub updated: usize,
}

impl<C: ChainRpc> PendingReconciler<C> {
    pub fn new(chain: Arc<C>, ledger: TransactionLedger) -> Self {
        Self { chain, ledger }
    }

    /// Look up receipts for every pending record younger than
    /// `max_age_secs`. Lookups run concurrently with no ordering between
    /// them; each update is independent and idempotent. Records without a
    /// receipt stay pending for a future sweep.
    pub async fn execute(&self, max_age_secs: u64) -> Result<SweepReport, FlowError> {
        let pending = self
            .ledger
            .list_pending(self.chain.network(), max_age_secs)
            .await?;
        let checked = pending.len();

        let lookups = pending.into_iter().map(|record| self.settle(record));
        let updated = join_all(lookups).await.into_iter().filter(|b| *b).count();

        info!(
            network = self.chain.network(),
            checked, updated, "pending sweep finished"
        );
        Ok(SweepReport { checked, updated })
    }

    /// Try to settle one record; `true` if a receipt was stored.
    async fn settle(&self, record: PendingTx) -> bool {
        let receipt = match self.chain.get_receipt(record.tx_hash).await {
            Ok(Some(receipt)) => receipt,
            Ok(None) => {
                debug!(tx_hash = %record.tx_hash, "still pending");
                return false;
            }
            Err(e) => {
                warn!(tx_hash = %record.tx_hash, "receipt lookup failed: {e}");
                return false;
            }
        };

        match self.ledger.update(record.tx_hash, &receipt).await {
            Ok(()) => true,
            Err(e) => {
                warn!(tx_hash = %record.tx_hash, "receipt store failed: {e}");
                false
            }
        }
    }
}
