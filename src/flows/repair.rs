use crate::chain::ChainRpc;
use crate::custodian::KeyCustodian;
use crate::store::NonceAllocator;
use crate::{FlowError, ReconcileOutcome};
use std::sync::Arc;
use tracing::info;

/// Realigns the stored nonce counter for the custodial address with the
/// chain-reported transaction count on one network.
///
/// Runs out of band (scheduled or triggered), never on the send path. A
/// repair racing a live allocation can act on a chain count that is
/// already stale; that window is accepted, see the allocator's
/// reconciliation rules.
pub struct NonceRepair<C> {
    chain: Arc<C>,
    custodian: Arc<KeyCustodian>,
    nonces: NonceAllocator,
}

impl<C: ChainRpc> NonceRepair<C> {
    pub fn new(chain: Arc<C>, custodian: Arc<KeyCustodian>, nonces: NonceAllocator) -> Self {
        Self {
            chain,
            custodian,
            nonces,
        }
    }

    pub async fn execute(&self) -> Result<ReconcileOutcome, FlowError> {
        let address = self.custodian.address();
        let chain_count = self
            .chain
            .get_transaction_count(address)
            .await?
            .as_u64();

        let outcome = self
            .nonces
            .reconcile(address, self.chain.network(), chain_count)
            .await?;

        info!(
            network = self.chain.network(),
            chain_count,
            ?outcome,
            "nonce repair finished"
        );
        Ok(outcome)
    }
}
