use crate::FlowError;
use crate::chain::ChainRpc;
use crate::codec;
use crate::custodian::KeyCustodian;
use crate::store::{NonceAllocator, TransactionLedger};
use ethers::types::transaction::eip2718::TypedTransaction;
use ethers::types::{Bytes, H256, U256};
use std::sync::Arc;
use tracing::{info, warn};

/// Units added on top of the node's gas estimate when filling a
/// transaction.
pub const GAS_LIMIT_BUFFER: u64 = 1_000;

/// Fills, signs, broadcasts and records transactions from the custodial
/// account on one network.
pub struct TxIssuer<C> {
    chain: Arc<C>,
    custodian: Arc<KeyCustodian>,
    nonces: NonceAllocator,
    ledger: TransactionLedger,
}

impl<C: ChainRpc> TxIssuer<C> {
    pub fn new(
        chain: Arc<C>,
        custodian: Arc<KeyCustodian>,
        nonces: NonceAllocator,
        ledger: TransactionLedger,
    ) -> Self {
        Self {
            chain,
            custodian,
            nonces,
            ledger,
        }
    }

    /// Populate gas price, nonce and gas limit on `tx`, then sign it with
    /// the custodial key.
    ///
    /// The nonce comes from the persisted allocator, never from chain
    /// state or memory; its failure aborts the call. Gas price and gas
    /// estimate are advisory and degrade to cached/default values inside
    /// the chain client.
    pub async fn fill_and_sign(&self, mut tx: TypedTransaction) -> Result<Bytes, FlowError> {
        let from = self.custodian.address();
        tx.set_from(from);
        tx.set_chain_id(self.chain.chain_id());

        let gas_price = self.chain.get_gas_price().await;
        tx.set_gas_price(gas_price);

        let nonce = self.nonces.allocate(from, self.chain.network()).await?;
        tx.set_nonce(nonce);

        let estimate = self.chain.estimate_gas(&tx).await;
        tx.set_gas(estimate + U256::from(GAS_LIMIT_BUFFER));

        let raw = self.custodian.sign(&tx)?;
        Ok(raw)
    }

    /// Broadcast raw signed bytes and persist the ledger record for the
    /// returned hash.
    pub async fn broadcast_and_record(&self, raw: Bytes) -> Result<H256, FlowError> {
        let (tx, _sig) = codec::decode_signed_bytes(&raw)
            .map_err(|e| FlowError::Upstream(format!("signed bytes do not decode: {e}")))?;
        let params = codec::to_params(&tx);

        let tx_hash = self.chain.broadcast(raw).await?;

        if let Err(e) = self.ledger.store(tx_hash, self.chain.network(), &params).await {
            // The transaction is on the wire; losing the record only
            // costs reconciliation coverage, the broadcast itself stands.
            warn!(
                network = self.chain.network(),
                %tx_hash,
                "broadcast succeeded but ledger store failed: {e}"
            );
            return Err(e.into());
        }

        info!(
            network = self.chain.network(),
            %tx_hash,
            nonce = %params.nonce,
            "transaction broadcast"
        );
        Ok(tx_hash)
    }

    /// Fill, sign, broadcast and record in one step.
    pub async fn send(&self, tx: TypedTransaction) -> Result<H256, FlowError> {
        let raw = self.fill_and_sign(tx).await?;
        self.broadcast_and_record(raw).await
    }
}
