//! Configuration Module
//!
//! This module defines all configuration structures for the relay service.
//! Configuration is loaded from TOML files and parsed using serde.

use serde::Deserialize;
use std::fs;

/// Main configuration structure
///
/// Contains all configuration sections for the relay service.
/// Loaded from a TOML file (e.g., config/default.toml).
///
/// # Example TOML
/// ```toml
/// [api]
/// host = "127.0.0.1"
/// port = 6000
///
/// [database]
/// url = "sqlite://fuel_relay.db?mode=rwc"
///
/// [custodian]
/// seed_phrase = "test test test test test test test test test test test junk"
///
/// [jobs]
/// interval_secs = 300
/// pending_max_age_secs = 3600
///
/// [[networks]]
/// name = "mainnet"
/// chain_id = 1
/// rpc_url = "https://mainnet.infura.io/"
/// balance_threshold_wei = "1000000000000000000"
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub api: ApiConfig,
    pub database: DatabaseConfig,
    pub custodian: CustodianConfig,
    pub jobs: JobsConfig,
    pub networks: Vec<NetworkConfig>,
}

/// API server configuration
///
/// # Fields
/// - `host`: IP address to bind to (e.g., "127.0.0.1" or "0.0.0.0")
/// - `port`: TCP port to listen on (e.g., 6000)
#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    pub host: String,
    pub port: u16,
}

/// Persisted store configuration
///
/// # Fields
/// - `url`: Database connection URL (e.g., "sqlite://fuel_relay.db?mode=rwc")
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
}

/// Custodial signing identity configuration
///
/// The seed phrase is consumed once at startup to derive the single
/// signing key shared across all networks.
#[derive(Debug, Clone, Deserialize)]
pub struct CustodianConfig {
    pub seed_phrase: String,
}

/// Background maintenance configuration
///
/// # Fields
/// - `interval_secs`: How often the maintenance sweep runs (nonce repair
///   and balance checks across all networks)
/// - `pending_max_age_secs`: Default lookback window for the pending
///   transaction reconciler
#[derive(Debug, Clone, Deserialize)]
pub struct JobsConfig {
    pub interval_secs: u64,
    pub pending_max_age_secs: u64,
}

/// One relayed network
///
/// The set of networks is fixed at deployment; entries are never added or
/// removed at runtime.
///
/// # Fields
/// - `name`: Network identifier used in request bodies (e.g., "mainnet")
/// - `chain_id`: EIP-155 chain id used when signing
/// - `rpc_url`: HTTP JSON-RPC endpoint for this network
/// - `balance_threshold_wei`: Custodian balance (wei, decimal string)
///   below which the maintenance sweep logs a warning
#[derive(Debug, Clone, Deserialize)]
pub struct NetworkConfig {
    pub name: String,
    pub chain_id: u64,
    pub rpc_url: String,
    pub balance_threshold_wei: String,
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// # Arguments
    /// * `path` - Path to the TOML configuration file
    ///
    /// # Returns
    /// * `Ok(Config)` if the file was successfully loaded and parsed
    /// * `Err` if the file couldn't be read or the TOML is invalid
    pub fn load(path: &str) -> anyhow::Result<Self> {
        let content = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }
}
