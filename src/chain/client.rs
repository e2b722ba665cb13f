use ethers::providers::{Http, Middleware, Provider};
use ethers::types::transaction::eip2718::TypedTransaction;
use ethers::types::{Address, Bytes, H256, TransactionReceipt, U256};
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::{debug, warn};

/// Fallback gas price used until the first successful market query:
/// 20 Gwei.
pub const DEFAULT_GAS_PRICE: u64 = 20_000_000_000;

/// Conservative gas estimate used when the node refuses to estimate.
pub const DEFAULT_GAS_ESTIMATE: u64 = 3_000_000;

#[derive(Debug, Error)]
pub enum ChainError {
    #[error("rpc error: {0}")]
    Rpc(String),

    #[error("invalid rpc endpoint: {0}")]
    Endpoint(String),
}

/// RPC operations the orchestration flows depend on, scoped to a single
/// network. Implemented by [`ChainClient`] for real nodes and by fakes in
/// tests.
#[allow(async_fn_in_trait)]
pub trait ChainRpc: Send + Sync {
    /// Network identifier this client is bound to.
    fn network(&self) -> &str;

    /// EIP-155 chain id used when signing for this network.
    fn chain_id(&self) -> u64;

    async fn get_balance(&self, address: Address) -> Result<U256, ChainError>;

    /// Current market gas price. Never fails: an RPC error falls back to
    /// the last observed value (initially 20 Gwei).
    async fn get_gas_price(&self) -> U256;

    /// Chain-reported count of transactions sent from `address`. This is
    /// the authoritative input for nonce reconciliation.
    async fn get_transaction_count(&self, address: Address) -> Result<U256, ChainError>;

    /// Gas estimate for `tx`. Never fails: an RPC error falls back to a
    /// fixed conservative default.
    async fn estimate_gas(&self, tx: &TypedTransaction) -> U256;

    /// Broadcast raw signed bytes, returning the transaction hash. The
    /// caller is responsible for persisting a ledger record on success.
    async fn broadcast(&self, raw: Bytes) -> Result<H256, ChainError>;

    async fn get_receipt(&self, tx_hash: H256) -> Result<Option<TransactionReceipt>, ChainError>;
}

/// JSON-RPC client for one network.
pub struct ChainClient {
    network: String,
    chain_id: u64,
    provider: Provider<Http>,
    /// Last observed market gas price, used when a live query fails.
    /// Updated opportunistically, never required to be fresh.
    gas_price_cache: RwLock<U256>,
}

impl ChainClient {
    pub fn new(network: &str, chain_id: u64, rpc_url: &str) -> Result<Self, ChainError> {
        let provider = Provider::<Http>::try_from(rpc_url)
            .map_err(|e| ChainError::Endpoint(e.to_string()))?;
        Ok(Self {
            network: network.to_string(),
            chain_id,
            provider,
            gas_price_cache: RwLock::new(U256::from(DEFAULT_GAS_PRICE)),
        })
    }
}

impl ChainRpc for ChainClient {
    fn network(&self) -> &str {
        &self.network
    }

    fn chain_id(&self) -> u64 {
        self.chain_id
    }

    async fn get_balance(&self, address: Address) -> Result<U256, ChainError> {
        self.provider
            .get_balance(address, None)
            .await
            .map_err(|e| ChainError::Rpc(e.to_string()))
    }

    async fn get_gas_price(&self) -> U256 {
        match self.provider.get_gas_price().await {
            Ok(price) => {
                *self.gas_price_cache.write().await = price;
                price
            }
            Err(e) => {
                let cached = *self.gas_price_cache.read().await;
                warn!(
                    network = %self.network,
                    "gas price query failed ({e}), using cached {cached}"
                );
                cached
            }
        }
    }

    async fn get_transaction_count(&self, address: Address) -> Result<U256, ChainError> {
        self.provider
            .get_transaction_count(address, None)
            .await
            .map_err(|e| ChainError::Rpc(e.to_string()))
    }

    async fn estimate_gas(&self, tx: &TypedTransaction) -> U256 {
        match self.provider.estimate_gas(tx, None).await {
            Ok(estimate) => estimate,
            Err(e) => {
                debug!(
                    network = %self.network,
                    "gas estimation failed ({e}), using default"
                );
                U256::from(DEFAULT_GAS_ESTIMATE)
            }
        }
    }

    async fn broadcast(&self, raw: Bytes) -> Result<H256, ChainError> {
        let pending = self
            .provider
            .send_raw_transaction(raw)
            .await
            .map_err(|e| ChainError::Rpc(e.to_string()))?;
        Ok(*pending)
    }

    async fn get_receipt(&self, tx_hash: H256) -> Result<Option<TransactionReceipt>, ChainError> {
        self.provider
            .get_transaction_receipt(tx_hash)
            .await
            .map_err(|e| ChainError::Rpc(e.to_string()))
    }
}
