//! This crate implements a custodial relay service for EVM-compatible
//! networks: it funds gas to addresses that need it, subject to abuse
//! checks, and relays pre-signed meta-transactions from a single
//! custodial key. The hard part lives in the nonce allocator and the
//! reconciliation flows, which keep the persisted sequence counters
//! aligned with what the chains have actually seen.

pub mod types; // Shared data structures and the flow error taxonomy.
pub mod config; // Defines and loads service configuration.
pub mod codec; // Decoding of caller-supplied signed transaction bytes.
pub mod registry; // Fixed table of relayed networks and their clients.
pub mod chain; // Per-network JSON-RPC facade.
pub mod custodian; // The single custodial signing identity.
pub mod store; // Persisted nonce counters and transaction ledger.
pub mod policy; // Pure gas-price and funding policy checks.
pub mod metatx; // Meta-transaction signature validation.
pub mod issuance; // Fill/sign/broadcast/record engine.
pub mod flows; // Orchestration flows exposed to the transport layer.
pub mod api; // HTTP server over the flows.
pub mod jobs; // Scheduled maintenance across all networks.

// Re-export commonly used types for easier access.
pub use types::{FlowError, ReconcileOutcome, TxParams};
pub use config::Config;
