//! Chain Client Module
//!
//! Thin RPC facade over one network's JSON-RPC endpoint: balance, gas
//! price, transaction count, gas estimation, broadcast and receipt fetch.
//! The advisory queries (gas price, gas estimate) degrade gracefully to
//! cached/default values instead of failing the caller; everything else
//! surfaces its error.
//!
//! The `ChainRpc` trait is the seam the orchestration flows are written
//! against, so tests can drive them with fake chains.

mod client;

pub use client::{ChainClient, ChainError, ChainRpc, DEFAULT_GAS_ESTIMATE, DEFAULT_GAS_PRICE};
