use ethers::signers::{LocalWallet, MnemonicBuilder, Signer, coins_bip39::English};
use ethers::types::transaction::eip2718::TypedTransaction;
use ethers::types::{Address, Bytes};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CustodianError {
    #[error("invalid seed phrase: {0}")]
    Seed(String),

    #[error("signing failed: {0}")]
    Sign(String),
}

/// The custodial signing identity.
///
/// One keypair per process, derived from the configured seed phrase. The
/// derived address is the account all relayed and funding transactions are
/// sent from, on every network.
pub struct KeyCustodian {
    wallet: LocalWallet,
}

impl KeyCustodian {
    /// Derive the signing key from a BIP-39 seed phrase.
    pub fn from_seed_phrase(phrase: &str) -> Result<Self, CustodianError> {
        let wallet = MnemonicBuilder::<English>::default()
            .phrase(phrase)
            .build()
            .map_err(|e| CustodianError::Seed(e.to_string()))?;
        Ok(Self { wallet })
    }

    /// The canonical account identifier, shared across all networks.
    pub fn address(&self) -> Address {
        self.wallet.address()
    }

    /// Sign a prepared transaction and return the raw signed bytes.
    ///
    /// The transaction must already carry nonce, gas price, gas limit and
    /// chain id; signing does not populate anything. Signer failures are
    /// surfaced to the caller, never retried here.
    pub fn sign(&self, tx: &TypedTransaction) -> Result<Bytes, CustodianError> {
        let chain_id = tx
            .chain_id()
            .map(|id| id.as_u64())
            .unwrap_or_else(|| self.wallet.chain_id());
        let wallet = self.wallet.clone().with_chain_id(chain_id);
        let sig = wallet
            .sign_transaction_sync(tx)
            .map_err(|e| CustodianError::Sign(e.to_string()))?;
        Ok(tx.rlp_signed(&sig))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec;
    use ethers::types::TransactionRequest;

    const TEST_PHRASE: &str =
        "test test test test test test test test test test test junk";

    #[test]
    fn address_is_stable_for_a_phrase() {
        let a = KeyCustodian::from_seed_phrase(TEST_PHRASE).unwrap();
        let b = KeyCustodian::from_seed_phrase(TEST_PHRASE).unwrap();
        assert_eq!(a.address(), b.address());
    }

    #[test]
    fn rejects_a_malformed_phrase() {
        assert!(matches!(
            KeyCustodian::from_seed_phrase("definitely not a mnemonic"),
            Err(CustodianError::Seed(_))
        ));
    }

    #[test]
    fn signed_bytes_recover_to_the_custodial_address() {
        let custodian = KeyCustodian::from_seed_phrase(TEST_PHRASE).unwrap();

        let tx: TypedTransaction = TransactionRequest::new()
            .to("0x1111111111111111111111111111111111111111"
                .parse::<Address>()
                .unwrap())
            .value(42u64)
            .gas(21_000u64)
            .gas_price(1_000_000_000u64)
            .nonce(0u64)
            .chain_id(4u64)
            .into();

        let raw = custodian.sign(&tx).unwrap();
        let (decoded, sig) = codec::decode_signed_bytes(&raw).unwrap();
        let sender = codec::recover_sender(&decoded, &sig).unwrap();
        assert_eq!(sender, custodian.address());
    }
}
