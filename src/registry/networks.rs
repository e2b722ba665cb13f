use crate::chain::{ChainClient, ChainError};
use crate::config::NetworkConfig;
use ethers::types::U256;
use std::collections::HashMap;
use std::sync::Arc;

/// One registered network: its client plus the deployment-time settings
/// the background jobs need.
pub struct NetworkHandle {
    pub name: String,
    pub chain_id: u64,
    pub client: Arc<ChainClient>,
    /// Custodian balance below which the maintenance sweep raises a
    /// warning, in wei.
    pub balance_threshold: U256,
}

/// Fixed set of network handles, keyed by name.
pub struct NetworkRegistry {
    networks: HashMap<String, NetworkHandle>,
}

impl NetworkRegistry {
    /// Build the registry from configuration. Fails if an RPC endpoint or
    /// balance threshold is malformed; a bad entry should stop the process
    /// at startup, not surface mid-request.
    pub fn from_config(configs: &[NetworkConfig]) -> Result<Self, ChainError> {
        let mut networks = HashMap::new();
        for cfg in configs {
            let client = Arc::new(ChainClient::new(&cfg.name, cfg.chain_id, &cfg.rpc_url)?);
            let balance_threshold = U256::from_dec_str(&cfg.balance_threshold_wei)
                .map_err(|e| ChainError::Endpoint(format!("bad balance threshold: {e}")))?;
            networks.insert(
                cfg.name.clone(),
                NetworkHandle {
                    name: cfg.name.clone(),
                    chain_id: cfg.chain_id,
                    client,
                    balance_threshold,
                },
            );
        }
        Ok(Self { networks })
    }

    pub fn get(&self, name: &str) -> Option<&NetworkHandle> {
        self.networks.get(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &NetworkHandle> {
        self.networks.values()
    }

    pub fn len(&self) -> usize {
        self.networks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.networks.is_empty()
    }
}
