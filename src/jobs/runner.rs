use crate::chain::ChainRpc;
use crate::config::JobsConfig;
use crate::custodian::KeyCustodian;
use crate::flows::{NonceRepair, PendingReconciler};
use crate::registry::{NetworkHandle, NetworkRegistry};
use crate::store::{NonceAllocator, TransactionLedger};
use std::sync::Arc;
use tokio::time::{Duration, sleep};
use tracing::{error, info, warn};

/// Periodic maintenance sweep over all registered networks.
pub struct Maintenance {
    registry: Arc<NetworkRegistry>,
    custodian: Arc<KeyCustodian>,
    nonces: NonceAllocator,
    ledger: TransactionLedger,
    config: JobsConfig,
}

impl Maintenance {
    pub fn new(
        registry: Arc<NetworkRegistry>,
        custodian: Arc<KeyCustodian>,
        nonces: NonceAllocator,
        ledger: TransactionLedger,
        config: JobsConfig,
    ) -> Self {
        Self {
            registry,
            custodian,
            nonces,
            ledger,
            config,
        }
    }

    /// Run the maintenance loop forever. Meant to be spawned as a
    /// background task next to the API server.
    pub async fn start(self) {
        let interval = Duration::from_secs(self.config.interval_secs);
        info!(
            interval_secs = self.config.interval_secs,
            networks = self.registry.len(),
            "maintenance loop starting"
        );

        loop {
            sleep(interval).await;
            self.run_once().await;
        }
    }

    /// One sweep across every network. Each network is handled
    /// independently; a failure is logged and the sweep moves on.
    pub async fn run_once(&self) {
        for network in self.registry.iter() {
            self.sweep_network(network).await;
        }
    }

    async fn sweep_network(&self, network: &NetworkHandle) {
        let repair = NonceRepair::new(
            network.client.clone(),
            self.custodian.clone(),
            self.nonces.clone(),
        );
        if let Err(e) = repair.execute().await {
            error!(network = %network.name, "nonce repair failed: {e}");
        }

        let reconciler = PendingReconciler::new(network.client.clone(), self.ledger.clone());
        if let Err(e) = reconciler.execute(self.config.pending_max_age_secs).await {
            error!(network = %network.name, "pending sweep failed: {e}");
        }

        self.check_balance(network).await;
    }

    /// Warn when the custodian account runs low on a network. The relay
    /// keeps working until the balance actually hits zero; this is the
    /// early signal to top it up.
    async fn check_balance(&self, network: &NetworkHandle) {
        let address = self.custodian.address();
        match network.client.get_balance(address).await {
            Ok(balance) if balance < network.balance_threshold => {
                warn!(
                    network = %network.name,
                    %balance,
                    threshold = %network.balance_threshold,
                    "custodian balance below threshold"
                );
            }
            Ok(balance) => {
                info!(network = %network.name, %balance, "custodian balance ok");
            }
            Err(e) => {
                error!(network = %network.name, "balance check failed: {e}");
            }
        }
    }
}
