use crate::FlowError;
use crate::chain::ChainRpc;
use crate::codec;
use crate::custodian::KeyCustodian;
use crate::issuance::TxIssuer;
use crate::metatx::MetaTxValidator;
use crate::store::{NonceAllocator, TransactionLedger};
use ethers::types::{H256, TransactionRequest};
use std::sync::Arc;
use tracing::{info, warn};

/// Relays a meta-signed transaction: the end user signed it, the
/// custodial account pays for and broadcasts it.
pub struct RelayFlow<C> {
    validator: MetaTxValidator,
    issuer: TxIssuer<C>,
}

impl<C: ChainRpc> RelayFlow<C> {
    pub fn new(
        chain: Arc<C>,
        custodian: Arc<KeyCustodian>,
        nonces: NonceAllocator,
        ledger: TransactionLedger,
    ) -> Self {
        Self {
            validator: MetaTxValidator::new(),
            issuer: TxIssuer::new(chain, custodian, nonces, ledger),
        }
    }

    /// Validate the meta signature, then re-issue the call from the
    /// custodial account.
    ///
    /// The signature check comes first: a rejected meta-transaction never
    /// consumes a nonce. The relayed transaction keeps the original
    /// destination, value and calldata; nonce, gas price and gas limit
    /// are replaced with custodial values before signing.
    ///
    /// Note: whether the authenticated transport-level caller matches the
    /// meta-transaction's signer is not checked here; the signature
    /// itself is the only gate.
    pub async fn execute(&self, meta_signed_tx: &str) -> Result<H256, FlowError> {
        if !self.validator.is_valid(meta_signed_tx) {
            warn!("relay rejected: meta tx signature invalid");
            return Err(FlowError::AuthFailure);
        }

        let (meta_tx, _sig) = codec::decode_signed_hex(meta_signed_tx)?;

        let mut tx = TransactionRequest::new();
        if let Some(to) = meta_tx.to() {
            tx = tx.to(to.clone());
        }
        if let Some(value) = meta_tx.value() {
            tx = tx.value(*value);
        }
        if let Some(data) = meta_tx.data() {
            tx = tx.data(data.clone());
        }

        let tx_hash = self.issuer.send(tx.into()).await?;
        info!(%tx_hash, "meta tx relayed");
        Ok(tx_hash)
    }
}
