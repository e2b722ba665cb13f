use ethers::types::{Address, Bytes, U256};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Transaction parameters captured at broadcast time.
///
/// This is the snapshot persisted alongside a ledger record so that a
/// stuck transaction can be inspected without re-decoding raw bytes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TxParams {
    pub to: Option<Address>,
    pub value: U256,
    pub gas_price: U256,
    pub gas_limit: U256,
    pub nonce: U256,
    pub data: Bytes,
}

/// Outcome of a nonce reconciliation pass for one (address, network) key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcileOutcome {
    /// The chain has never seen this account; counter reset to 0.
    ResetToZero,
    /// Local counter had outpaced the chain; rolled back so the next
    /// allocation reissues the stuck value.
    RolledBack { to: u64 },
    /// Local counter is at or behind the chain-reported count.
    Unchanged,
    /// No counter was ever allocated for this key.
    NeverAllocated,
}

/// Failure taxonomy for the relay/fund/reconcile flows.
///
/// The variants map onto distinct HTTP statuses at the API boundary:
/// validation problems are the caller's fault, policy rejections are
/// deliberate business decisions, auth failures stop a flow before any
/// nonce is consumed, and upstream failures cover RPC/store breakage.
#[derive(Debug, Error)]
pub enum FlowError {
    /// Required field missing or malformed input. Never retried.
    #[error("{0}")]
    Validation(String),

    /// Gas-price abuse or funding-not-needed. A rejection, not a failure.
    #[error("{0}")]
    PolicyRejection(String),

    /// Meta-transaction signature invalid. Hard stop before signing.
    #[error("MetaTx signature invalid")]
    AuthFailure,

    /// RPC node or persisted store unreachable/erroring.
    #[error("{0}")]
    Upstream(String),
}

impl From<crate::store::StoreError> for FlowError {
    fn from(e: crate::store::StoreError) -> Self {
        FlowError::Upstream(e.to_string())
    }
}

impl From<crate::chain::ChainError> for FlowError {
    fn from(e: crate::chain::ChainError) -> Self {
        FlowError::Upstream(e.to_string())
    }
}

impl From<crate::codec::CodecError> for FlowError {
    fn from(e: crate::codec::CodecError) -> Self {
        FlowError::Validation(e.to_string())
    }
}

impl From<crate::custodian::CustodianError> for FlowError {
    fn from(e: crate::custodian::CustodianError) -> Self {
        FlowError::Upstream(e.to_string())
    }
}
