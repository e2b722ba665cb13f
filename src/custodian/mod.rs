//! Key Custodian Module
//!
//! Holds the single signing identity for the whole process. The keypair is
//! derived once at startup from a BIP-39 seed phrase and shared, behind an
//! `Arc`, by every flow that needs to sign.

mod keys;

pub use keys::{CustodianError, KeyCustodian};
