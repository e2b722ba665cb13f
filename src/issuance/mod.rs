//! Transaction Issuance Module
//!
//! The shared engine behind both the relay and fund flows: it populates a
//! transaction with live market gas price, an allocated nonce and a
//! buffered gas estimate, signs it with the custodial key, broadcasts it
//! and persists the ledger record. Everything that spends from the
//! custodial account goes through this path.

mod issuer;

pub use issuer::{GAS_LIMIT_BUFFER, TxIssuer};
