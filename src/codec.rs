//! Raw Transaction Codec
//!
//! Decoding helpers for hex-encoded signed transactions. Both the fund
//! flow (candidate transaction) and the relay flow (meta-signed
//! transaction) receive raw signed bytes from callers; this module turns
//! them back into typed transactions plus their signatures.

use crate::TxParams;
use ethers::types::transaction::eip2718::TypedTransaction;
use ethers::types::{Address, Signature, U256};
use ethers::utils::hex;
use ethers::utils::rlp::Rlp;
use thiserror::Error;

/// Errors produced while decoding caller-supplied transaction bytes.
#[derive(Debug, Error)]
pub enum CodecError {
    #[error("invalid hex encoding: {0}")]
    InvalidHex(String),

    #[error("invalid transaction encoding: {0}")]
    InvalidRlp(String),

    #[error("signature does not recover to a sender")]
    Unrecoverable,
}

/// Decode a hex-encoded signed transaction into its typed form and
/// signature. A leading `0x` is tolerated.
pub fn decode_signed_hex(tx_hex: &str) -> Result<(TypedTransaction, Signature), CodecError> {
    let cleaned = tx_hex.strip_prefix("0x").unwrap_or(tx_hex);
    let bytes = hex::decode(cleaned).map_err(|e| CodecError::InvalidHex(e.to_string()))?;
    decode_signed_bytes(&bytes)
}

/// Decode raw signed transaction bytes.
pub fn decode_signed_bytes(bytes: &[u8]) -> Result<(TypedTransaction, Signature), CodecError> {
    let rlp = Rlp::new(bytes);
    TypedTransaction::decode_signed(&rlp).map_err(|e| CodecError::InvalidRlp(e.to_string()))
}

/// Recover the sender address from a decoded transaction and signature.
pub fn recover_sender(tx: &TypedTransaction, sig: &Signature) -> Result<Address, CodecError> {
    sig.recover(tx.sighash()).map_err(|_| CodecError::Unrecoverable)
}

/// Snapshot the fields of a typed transaction for ledger persistence.
pub fn to_params(tx: &TypedTransaction) -> TxParams {
    TxParams {
        to: tx.to().and_then(|t| t.as_address()).copied(),
        value: tx.value().copied().unwrap_or_default(),
        gas_price: tx.gas_price().unwrap_or_default(),
        gas_limit: tx.gas().copied().unwrap_or_default(),
        nonce: tx.nonce().copied().unwrap_or_default(),
        data: tx.data().cloned().unwrap_or_default(),
    }
}

/// Gas price declared by a decoded transaction, or a validation error if
/// the encoding carried none.
pub fn declared_gas_price(tx: &TypedTransaction) -> Result<U256, CodecError> {
    tx.gas_price()
        .ok_or_else(|| CodecError::InvalidRlp("transaction carries no gas price".to_string()))
}

/// Gas limit declared by a decoded transaction, or a validation error if
/// the encoding carried none.
pub fn declared_gas_limit(tx: &TypedTransaction) -> Result<U256, CodecError> {
    tx.gas()
        .copied()
        .ok_or_else(|| CodecError::InvalidRlp("transaction carries no gas limit".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ethers::signers::{LocalWallet, Signer};
    use ethers::types::TransactionRequest;

    fn test_wallet() -> LocalWallet {
        "4c0883a69102937d6231471b5dbb6204fe5129617082792ae468d01a3f362318"
            .parse::<LocalWallet>()
            .unwrap()
            .with_chain_id(1u64)
    }

    fn signed_tx_hex(wallet: &LocalWallet) -> String {
        let tx: TypedTransaction = TransactionRequest::new()
            .to("0x2222222222222222222222222222222222222222"
                .parse::<Address>()
                .unwrap())
            .value(1_000_000u64)
            .gas(21_000u64)
            .gas_price(20_000_000_000u64)
            .nonce(0u64)
            .chain_id(1u64)
            .into();
        let sig = wallet.sign_transaction_sync(&tx).unwrap();
        hex::encode(tx.rlp_signed(&sig))
    }

    #[test]
    fn decodes_with_and_without_prefix() {
        let wallet = test_wallet();
        let raw = signed_tx_hex(&wallet);

        let (tx, _) = decode_signed_hex(&raw).unwrap();
        assert_eq!(tx.gas().copied(), Some(U256::from(21_000u64)));

        let (tx, _) = decode_signed_hex(&format!("0x{raw}")).unwrap();
        assert_eq!(tx.value().copied(), Some(U256::from(1_000_000u64)));
    }

    #[test]
    fn recovers_the_signing_address() {
        let wallet = test_wallet();
        let raw = signed_tx_hex(&wallet);

        let (tx, sig) = decode_signed_hex(&raw).unwrap();
        let sender = recover_sender(&tx, &sig).unwrap();
        assert_eq!(sender, wallet.address());
    }

    #[test]
    fn rejects_garbage_input() {
        assert!(matches!(
            decode_signed_hex("not-hex"),
            Err(CodecError::InvalidHex(_))
        ));
        assert!(matches!(
            decode_signed_hex("deadbeef"),
            Err(CodecError::InvalidRlp(_))
        ));
    }

    #[test]
    fn snapshots_transaction_params() {
        let wallet = test_wallet();
        let raw = signed_tx_hex(&wallet);

        let (tx, _) = decode_signed_hex(&raw).unwrap();
        let params = to_params(&tx);
        assert_eq!(params.gas_limit, U256::from(21_000u64));
        assert_eq!(params.gas_price, U256::from(20_000_000_000u64));
        assert_eq!(params.value, U256::from(1_000_000u64));
    }
}
