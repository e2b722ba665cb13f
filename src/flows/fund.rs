use crate::FlowError;
use crate::chain::ChainRpc;
use crate::codec;
use crate::custodian::KeyCustodian;
use crate::issuance::TxIssuer;
use crate::policy::{self, FundingDecision};
use crate::store::{NonceAllocator, TransactionLedger};
use ethers::types::{H256, TransactionRequest};
use std::sync::Arc;
use tracing::{info, warn};

/// Funds gas to the sender of a candidate transaction, subject to abuse
/// checks.
///
/// The candidate is a fully signed transaction the user intends to submit
/// later; it is decoded and verified here only to learn who the sender is
/// and what the submission will cost. It is never broadcast by this flow.
pub struct FundFlow<C> {
    chain: Arc<C>,
    issuer: TxIssuer<C>,
}

impl<C: ChainRpc> FundFlow<C> {
    pub fn new(
        chain: Arc<C>,
        custodian: Arc<KeyCustodian>,
        nonces: NonceAllocator,
        ledger: TransactionLedger,
    ) -> Self {
        Self {
            chain: chain.clone(),
            issuer: TxIssuer::new(chain, custodian, nonces, ledger),
        }
    }

    pub async fn execute(&self, candidate_tx_hex: &str) -> Result<H256, FlowError> {
        // Decode and verify the candidate; undecodable or unrecoverable
        // input is the caller's problem
        let (candidate, sig) = codec::decode_signed_hex(candidate_tx_hex)?;
        let sender = codec::recover_sender(&candidate, &sig)?;
        let gas_price = codec::declared_gas_price(&candidate)?;
        let gas_limit = codec::declared_gas_limit(&candidate)?;

        // Gas price ceiling against the live market price
        let market = self.chain.get_gas_price().await;
        if policy::is_abusive(gas_price, market) {
            warn!(
                network = self.chain.network(),
                %gas_price,
                %market,
                "funding rejected: abusive gas price"
            );
            return Err(FlowError::PolicyRejection(
                "tx.gasPrice too high. Not funding.".to_string(),
            ));
        }

        let balance = self.chain.get_balance(sender).await?;

        let amount = match policy::funding_amount(gas_price, gas_limit, balance) {
            FundingDecision::AlreadyFunded { balance, tolerance } => {
                info!(
                    network = self.chain.network(),
                    ?sender,
                    %balance,
                    %tolerance,
                    "funding refused: enough balance"
                );
                return Err(FlowError::PolicyRejection(
                    "enough balance. Not sending funds".to_string(),
                ));
            }
            FundingDecision::Fund { amount } => amount,
        };

        // Plain value transfer to the candidate's sender
        let funding_tx = TransactionRequest::new().to(sender).value(amount);
        let tx_hash = self.issuer.send(funding_tx.into()).await?;

        info!(
            network = self.chain.network(),
            ?sender,
            %amount,
            %tx_hash,
            "funding transaction sent"
        );
        Ok(tx_hash)
    }
}
