//! Meta-Transaction Validation Module
//!
//! The sole gate in front of the relay path: a meta-transaction whose
//! signature does not verify is rejected before any nonce is allocated or
//! anything is signed.

mod validator;

pub use validator::MetaTxValidator;
