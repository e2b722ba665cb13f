//! Network Registry Module
//!
//! Static table of the networks this deployment relays for. Built once
//! from configuration at startup and never mutated afterwards; lookups by
//! name serve the request path, iteration serves the background sweeps.

mod networks;

pub use networks::{NetworkHandle, NetworkRegistry};
