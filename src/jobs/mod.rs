//! Background Maintenance Module
//!
//! Scheduled work that runs independently of the HTTP surface: nonce
//! repair and custodian balance checks across every registered network,
//! plus a pending-transaction sweep. One network failing must never
//! abort the sweep for the others.

mod runner;

pub use runner::Maintenance;
