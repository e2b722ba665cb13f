//! Gas Policy Module
//!
//! Pure policy checks that gate transaction issuance: the gas-price abuse
//! ceiling and the funding-amount computation. No I/O happens here; the
//! flows feed in live chain data and act on the returned decisions.

mod gas;

pub use gas::{ABUSE_MULTIPLIER, FundingDecision, funding_amount, is_abusive};
